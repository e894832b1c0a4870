//! Process-facing entry point wiring a document store, a clock and a user together.

use std::sync::Arc;

use chrono::NaiveDate;
use pandl_config::Config;
use pandl_domain::{FiscalYear, FixedCost, MonthKey, MonthlySummary, MONTHS_PER_FISCAL_YEAR};
use pandl_engine::{
    AggregationService, Clock, ComparisonResult, ComparisonService, CoreError, CostContribution,
    DocumentStore, MemoryDocumentStore, ReconcileReport, ReconcileService, RecurrenceService,
    RolloverReport, RolloverService, SourceReader, SystemClock, YearRepository,
};
use pandl_storage_json::JsonDocumentStore;
use tracing::info;

use crate::PnlError;

/// One user's profit-and-loss books.
#[derive(Clone)]
pub struct PnlLedger {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    user: String,
}

impl PnlLedger {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, user: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            user: user.into(),
        }
    }

    /// Ledger over a fresh in-memory store and the system clock.
    pub fn in_memory(user: impl Into<String>) -> Self {
        Self::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(SystemClock),
            user,
        )
    }

    /// Opens the JSON document store described by `config`.
    pub fn open(config: &Config) -> Result<Self, PnlError> {
        let root = config.resolve_data_root();
        let store =
            JsonDocumentStore::with_max_batch_ops(root.clone(), config.effective_max_batch_ops())?;
        info!(root = %root.display(), user = %config.user_id, "opened document store");
        Ok(Self::new(
            Arc::new(store),
            Arc::new(SystemClock),
            config.user_id.clone(),
        ))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Typed access to one fiscal year's collections.
    pub fn year(&self, year: FiscalYear) -> YearRepository<'_> {
        YearRepository::new(self.store.as_ref(), self.user.clone(), year)
    }

    pub fn current_year(&self) -> FiscalYear {
        FiscalYear::containing(self.clock.today())
    }

    pub fn fiscal_year_months(year: FiscalYear) -> [MonthKey; MONTHS_PER_FISCAL_YEAR] {
        year.months()
    }

    pub fn is_date_in_fiscal_year(date: NaiveDate, year: FiscalYear) -> bool {
        year.contains(date)
    }

    pub fn evaluate_fixed_cost_for_month(cost: &FixedCost, month: MonthKey) -> f64 {
        RecurrenceService::contribution(cost, month)
    }

    pub fn fixed_cost_breakdown(
        &self,
        year: FiscalYear,
        month: MonthKey,
    ) -> Result<Vec<CostContribution>, CoreError> {
        year.require_month(month)?;
        let costs = self.year(year).fixed_costs()?;
        Ok(RecurrenceService::breakdown(&costs, month))
    }

    pub fn aggregate_month(
        &self,
        year: FiscalYear,
        month: MonthKey,
    ) -> Result<MonthlySummary, CoreError> {
        AggregationService::aggregate_month(&self.year(year), month, self.clock.as_ref())
    }

    pub fn recompute_year(&self, year: FiscalYear) -> Result<Vec<MonthlySummary>, CoreError> {
        AggregationService::recompute_year(&self.year(year), self.clock.as_ref())
    }

    pub fn reconcile_year(&self, year: FiscalYear) -> Result<ReconcileReport, CoreError> {
        ReconcileService::reconcile_year(&self.year(year))
    }

    pub fn rebuild_year(&self, year: FiscalYear) -> Result<Vec<MonthlySummary>, CoreError> {
        ReconcileService::rebuild_year(&self.year(year), self.clock.as_ref())
    }

    pub fn compare_years(&self, years: &[FiscalYear]) -> Result<ComparisonResult, CoreError> {
        ComparisonService::compare(self.store.as_ref(), &self.user, years, self.clock.as_ref())
    }

    /// Opens the year after `year`, carrying over its active fixed costs.
    pub fn start_next_year(&self, year: FiscalYear) -> Result<RolloverReport, CoreError> {
        RolloverService::start_next_year(&self.year(year))
    }

    /// Whether `year` has ended and the next one should be opened.
    pub fn needs_rollover(&self, year: FiscalYear) -> bool {
        RolloverService::needs_rollover(year, self.clock.today())
    }
}
