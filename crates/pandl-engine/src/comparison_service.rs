//! Year-on-year comparison aligned by fiscal month.

use pandl_domain::{FiscalYear, MonthKey, MonthlySummary, MONTHS_PER_FISCAL_YEAR};
use tracing::{info, warn};

use crate::{
    aggregation_service::AggregationService, reconcile_service::ReconcileService,
    repository::YearRepository, storage::DocumentStore, time::Clock, CoreError,
};

/// Percentage change from `previous` to `current`. Undefined when `previous` is zero.
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Sums over one year's twelve summaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearTotals {
    pub year: FiscalYear,
    pub gross_income: f64,
    pub net_income: f64,
    pub vat: f64,
    pub wages: f64,
    pub fixed_costs: f64,
    pub sundries: f64,
    pub profit: f64,
}

impl YearTotals {
    pub fn from_summaries(year: FiscalYear, summaries: &[MonthlySummary]) -> Self {
        let mut totals = YearTotals {
            year,
            gross_income: 0.0,
            net_income: 0.0,
            vat: 0.0,
            wages: 0.0,
            fixed_costs: 0.0,
            sundries: 0.0,
            profit: 0.0,
        };
        for summary in summaries {
            totals.gross_income += summary.gross_income;
            totals.net_income += summary.net_income;
            totals.vat += summary.vat;
            totals.wages += summary.wages;
            totals.fixed_costs += summary.fixed_costs;
            totals.sundries += summary.sundries;
            totals.profit += summary.profit;
        }
        totals
    }

    pub fn costs(&self) -> f64 {
        self.wages + self.fixed_costs + self.sundries
    }
}

/// One year's figures for a fiscal month. Missing summaries read as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthCell {
    pub year: FiscalYear,
    pub month: MonthKey,
    pub net_income: f64,
    pub costs: f64,
    pub profit: f64,
}

/// A fiscal month across every compared year, e.g. "Oct" of each year.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthRow {
    /// 1 for October through 12 for September.
    pub position: usize,
    pub label: &'static str,
    pub cells: Vec<MonthCell>,
}

/// Percentage changes between two consecutive compared years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearDelta {
    pub current: FiscalYear,
    pub previous: FiscalYear,
    pub gross_income: Option<f64>,
    pub net_income: Option<f64>,
    pub wages: Option<f64>,
    pub fixed_costs: Option<f64>,
    pub sundries: Option<f64>,
    pub costs: Option<f64>,
    pub profit: Option<f64>,
}

impl YearDelta {
    pub fn between(current: &YearTotals, previous: &YearTotals) -> Self {
        Self {
            current: current.year,
            previous: previous.year,
            gross_income: pct_change(current.gross_income, previous.gross_income),
            net_income: pct_change(current.net_income, previous.net_income),
            wages: pct_change(current.wages, previous.wages),
            fixed_costs: pct_change(current.fixed_costs, previous.fixed_costs),
            sundries: pct_change(current.sundries, previous.sundries),
            costs: pct_change(current.costs(), previous.costs()),
            profit: pct_change(current.profit, previous.profit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Compared years, oldest first.
    pub years: Vec<FiscalYear>,
    pub per_year_totals: Vec<YearTotals>,
    pub per_month_rows: Vec<MonthRow>,
    /// One entry per consecutive pair in `years`.
    pub deltas: Vec<YearDelta>,
    /// Years whose summaries were recomputed before comparing.
    pub recomputed: Vec<FiscalYear>,
}

impl ComparisonResult {
    /// Delta between the two most recent years, the headline figure.
    pub fn latest_delta(&self) -> Option<&YearDelta> {
        self.deltas.last()
    }
}

pub struct ComparisonService;

impl ComparisonService {
    /// Loads, self-heals and compares `years` for `user`.
    pub fn compare(
        store: &dyn DocumentStore,
        user: &str,
        years: &[FiscalYear],
        clock: &dyn Clock,
    ) -> Result<ComparisonResult, CoreError> {
        let mut ordered = years.to_vec();
        ordered.sort();
        ordered.dedup();
        if ordered.is_empty() {
            return Err(CoreError::InvalidOperation(
                "no fiscal years selected for comparison".into(),
            ));
        }

        let mut recomputed = Vec::new();
        let mut loaded = Vec::with_capacity(ordered.len());
        for year in ordered {
            let repo = YearRepository::new(store, user, year);
            let mut summaries = ReconcileService::deduplicated(&repo)?;
            if !summaries.iter().any(MonthlySummary::has_trading_data) {
                warn!(year = %year, "no trading data in summaries, recomputing before comparison");
                summaries = AggregationService::recompute_year(&repo, clock)?;
                recomputed.push(year);
            }
            loaded.push((year, summaries));
        }

        let mut result = Self::build(&loaded);
        result.recomputed = recomputed;
        info!(
            years = result.years.len(),
            recomputed = result.recomputed.len(),
            "compared fiscal years"
        );
        Ok(result)
    }

    /// Pure comparison over already-loaded summaries, oldest year first.
    pub fn build(loaded: &[(FiscalYear, Vec<MonthlySummary>)]) -> ComparisonResult {
        let years: Vec<FiscalYear> = loaded.iter().map(|(year, _)| *year).collect();
        let per_year_totals: Vec<YearTotals> = loaded
            .iter()
            .map(|(year, summaries)| YearTotals::from_summaries(*year, summaries))
            .collect();

        let per_month_rows = (1..=MONTHS_PER_FISCAL_YEAR)
            .filter_map(|position| {
                let cells = loaded
                    .iter()
                    .filter_map(|(year, summaries)| {
                        let month = year.month_at(position)?;
                        let found = summaries.iter().find(|summary| summary.month == month);
                        Some(MonthCell {
                            year: *year,
                            month,
                            net_income: found.map_or(0.0, |s| s.net_income),
                            costs: found.map_or(0.0, MonthlySummary::costs),
                            profit: found.map_or(0.0, |s| s.profit),
                        })
                    })
                    .collect::<Vec<_>>();
                let label = cells.first()?.month.short_label();
                Some(MonthRow {
                    position,
                    label,
                    cells,
                })
            })
            .collect();

        let deltas = per_year_totals
            .windows(2)
            .map(|pair| YearDelta::between(&pair[1], &pair[0]))
            .collect();

        ComparisonResult {
            years,
            per_year_totals,
            per_month_rows,
            deltas,
            recomputed: Vec::new(),
        }
    }
}
