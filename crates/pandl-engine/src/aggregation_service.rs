//! Builds monthly summaries from the source collections.

use chrono::{DateTime, Utc};
use pandl_domain::{IncomeTotals, MonthKey, MonthlySummary};
use tracing::{debug, info};

use crate::{
    recurrence_service::RecurrenceService,
    repository::{SourceReader, YearRepository},
    time::Clock,
    CoreError,
};

pub struct AggregationService;

impl AggregationService {
    /// Derives the summary for `month` without writing anything.
    pub fn compute(
        sources: &dyn SourceReader,
        month: MonthKey,
        now: DateTime<Utc>,
    ) -> Result<MonthlySummary, CoreError> {
        sources.fiscal_year().require_month(month)?;

        let figures = sources.daily_figures_between(month.first_day(), month.last_day())?;
        let income: IncomeTotals = figures.iter().collect();
        let wages = sources.wage_for(month)?.map_or(0.0, |record| record.total);
        let fixed_costs = RecurrenceService::sum_fixed_costs(&sources.fixed_costs()?, month);
        let sundries: f64 = sources
            .sundries_in(month)?
            .iter()
            .fold(0.0, |total, sundry| total + sundry.amount);

        Ok(MonthlySummary::new(
            month,
            income,
            wages,
            fixed_costs,
            sundries,
            now,
        ))
    }

    /// Computes `month` and writes it as a full replacement of the stored summary.
    pub fn aggregate_month(
        repo: &YearRepository<'_>,
        month: MonthKey,
        clock: &dyn Clock,
    ) -> Result<MonthlySummary, CoreError> {
        let summary = Self::compute(repo, month, clock.now())?;
        repo.replace_summary(&summary)?;
        debug!(
            year = %repo.year(),
            month = %month,
            net_income = summary.net_income,
            wages = summary.wages,
            fixed_costs = summary.fixed_costs,
            sundries = summary.sundries,
            profit = summary.profit,
            "aggregated month"
        );
        Ok(summary)
    }

    /// Recomputes the twelve months in fiscal order, one write at a time.
    /// Stops at the first failure; months already written stay written.
    pub fn recompute_year(
        repo: &YearRepository<'_>,
        clock: &dyn Clock,
    ) -> Result<Vec<MonthlySummary>, CoreError> {
        let summaries = repo
            .year()
            .months()
            .into_iter()
            .map(|month| Self::aggregate_month(repo, month, clock))
            .collect::<Result<Vec<_>, _>>()?;
        let profit = summaries
            .iter()
            .fold(0.0, |total, summary| total + summary.profit);
        info!(year = %repo.year(), profit, "recomputed fiscal year");
        Ok(summaries)
    }
}
