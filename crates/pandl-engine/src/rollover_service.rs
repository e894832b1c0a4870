//! Opening a new fiscal year.

use chrono::NaiveDate;
use pandl_domain::FiscalYear;
use tracing::info;

use crate::{
    recurrence_service::RecurrenceService,
    repository::{SourceReader, YearRepository},
    storage::{write_in_chunks, BatchOp, Collection, WriteMode},
    CoreError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverReport {
    pub copied: Vec<String>,
    pub skipped_cancelled: Vec<String>,
    pub already_present: Vec<String>,
}

pub struct RolloverService;

impl RolloverService {
    pub fn needs_rollover(year: FiscalYear, today: NaiveDate) -> bool {
        year.is_past_end(today)
    }

    /// Copies every fixed cost still accruing in the following year, keeping any
    /// cancellation date. Costs cancelled before that year starts are skipped and
    /// costs already present there are left untouched, so re-running is harmless.
    pub fn start_next_year(from: &YearRepository<'_>) -> Result<RolloverReport, CoreError> {
        let target = from.for_year(from.year().next());
        let path = target.path(Collection::FixedCosts);
        let opening_month = target.year().months()[0];

        let mut report = RolloverReport::default();
        let mut ops = Vec::new();
        for cost in from.fixed_costs()? {
            if !RecurrenceService::is_active_in(&cost, opening_month) {
                report.skipped_cancelled.push(cost.service_id);
                continue;
            }
            if target.fixed_cost(&cost.service_id)?.is_some() {
                report.already_present.push(cost.service_id);
                continue;
            }
            ops.push(BatchOp::Put {
                path: path.clone(),
                id: cost.service_id.clone(),
                data: serde_json::to_value(&cost)?,
                mode: WriteMode::Replace,
            });
            report.copied.push(cost.service_id);
        }
        write_in_chunks(from.store(), ops)?;

        info!(
            from = %from.year(),
            to = %target.year(),
            copied = report.copied.len(),
            skipped = report.skipped_cancelled.len() + report.already_present.len(),
            "started next fiscal year"
        );
        Ok(report)
    }
}
