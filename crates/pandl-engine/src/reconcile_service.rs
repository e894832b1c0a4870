//! Keeps exactly one summary per month and rebuilds years from scratch.

use std::{cmp::Ordering, collections::BTreeMap};

use pandl_domain::{MonthKey, MonthlySummary};
use tracing::{debug, info, warn};

use crate::{
    aggregation_service::AggregationService,
    repository::{StoredSummary, SummaryScan, YearRepository},
    storage::Collection,
    time::Clock,
    CoreError,
};

/// Which summaries survive deduplication and which are deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub kept: BTreeMap<MonthKey, StoredSummary>,
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub kept: usize,
    pub deleted: usize,
}

pub struct ReconcileService;

impl ReconcileService {
    /// Ranks candidates best-first: completeness, then newest `updatedAt`, then smallest id.
    pub fn rank(a: &StoredSummary, b: &StoredSummary) -> Ordering {
        b.summary
            .completeness_score()
            .cmp(&a.summary.completeness_score())
            .then_with(|| b.summary.updated_at.cmp(&a.summary.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Groups candidates by month and picks one survivor per group.
    pub fn plan(candidates: Vec<StoredSummary>) -> ReconcilePlan {
        let mut groups: BTreeMap<MonthKey, Vec<StoredSummary>> = BTreeMap::new();
        for candidate in candidates {
            groups
                .entry(candidate.summary.month)
                .or_default()
                .push(candidate);
        }

        let mut plan = ReconcilePlan::default();
        for (month, mut group) in groups {
            group.sort_by(Self::rank);
            let mut rest = group.into_iter();
            let Some(winner) = rest.next() else {
                continue;
            };
            for loser in rest {
                if loser.summary.completeness_score() == winner.summary.completeness_score()
                    && loser.summary.updated_at == winner.summary.updated_at
                {
                    warn!(
                        month = %month,
                        kept = %winner.id,
                        dropped = %loser.id,
                        "reconciliation conflict: equal completeness and timestamp"
                    );
                }
                plan.deleted.push(loser.id);
            }
            plan.kept.insert(month, winner);
        }
        plan
    }

    /// Like [`ReconcileService::plan`], with undecodable documents ranked below
    /// every readable one. They are deleted when a readable summary of the same
    /// month survives and kept otherwise, so the month is never left empty.
    pub fn plan_scan(scan: SummaryScan) -> ReconcilePlan {
        let mut plan = Self::plan(scan.readable);
        for unreadable in scan.unreadable {
            if let Some(winner) = plan.kept.get(&unreadable.month) {
                debug!(
                    month = %unreadable.month,
                    kept = %winner.id,
                    dropped = %unreadable.id,
                    "dropping unreadable duplicate summary"
                );
                plan.deleted.push(unreadable.id);
            } else {
                warn!(
                    month = %unreadable.month,
                    id = %unreadable.id,
                    "unreadable summary has no readable replacement, leaving it"
                );
            }
        }
        plan
    }

    /// Deletes duplicate summaries for the year. Running it twice deletes nothing more.
    pub fn reconcile_year(repo: &YearRepository<'_>) -> Result<ReconcileReport, CoreError> {
        let plan = Self::plan_scan(repo.scan_summaries()?);
        repo.delete_all(Collection::MonthlySummaries, &plan.deleted)?;
        let report = ReconcileReport {
            kept: plan.kept.len(),
            deleted: plan.deleted.len(),
        };
        info!(
            year = %repo.year(),
            kept = report.kept,
            deleted = report.deleted,
            "reconciled monthly summaries"
        );
        Ok(report)
    }

    /// Deletes every summary of the year, then recomputes the twelve months in order.
    pub fn rebuild_year(
        repo: &YearRepository<'_>,
        clock: &dyn Clock,
    ) -> Result<Vec<MonthlySummary>, CoreError> {
        let ids = repo.summary_ids()?;
        repo.delete_all(Collection::MonthlySummaries, &ids)?;
        let summaries = AggregationService::recompute_year(repo, clock)?;
        info!(year = %repo.year(), removed = ids.len(), "rebuilt fiscal year");
        Ok(summaries)
    }

    /// One summary per month after deduplication, in fiscal order, without writing.
    pub fn deduplicated(repo: &YearRepository<'_>) -> Result<Vec<MonthlySummary>, CoreError> {
        Ok(Self::plan(repo.summaries()?)
            .kept
            .into_values()
            .map(|stored| stored.summary)
            .filter(|summary| repo.year().contains_month(summary.month))
            .collect())
    }
}
