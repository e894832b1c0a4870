//! The derived per-month profit-and-loss summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{figures::DailyFigure, fiscal::MonthKey};

/// Income sums over a set of daily figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeTotals {
    pub gross_income: f64,
    pub net_income: f64,
    pub vat: f64,
}

impl IncomeTotals {
    pub fn add(&mut self, figure: &DailyFigure) {
        self.gross_income += figure.gross_income;
        self.net_income += figure.net_income;
        self.vat += figure.vat;
    }
}

impl<'a> FromIterator<&'a DailyFigure> for IncomeTotals {
    fn from_iter<I: IntoIterator<Item = &'a DailyFigure>>(iter: I) -> Self {
        let mut totals = IncomeTotals::default();
        for figure in iter {
            totals.add(figure);
        }
        totals
    }
}

/// `netIncome - wages - fixedCosts - sundries`. Every cost is subtracted exactly once.
pub fn profit_for(net_income: f64, wages: f64, fixed_costs: f64, sundries: f64) -> f64 {
    net_income - wages - fixed_costs - sundries
}

/// Materialized view of one fiscal month. Reproducible from the source records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub month: MonthKey,
    #[serde(default)]
    pub gross_income: f64,
    #[serde(default)]
    pub net_income: f64,
    #[serde(default)]
    pub vat: f64,
    #[serde(default)]
    pub wages: f64,
    #[serde(default)]
    pub fixed_costs: f64,
    #[serde(default)]
    pub sundries: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonthlySummary {
    pub fn new(
        month: MonthKey,
        income: IncomeTotals,
        wages: f64,
        fixed_costs: f64,
        sundries: f64,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            month,
            gross_income: income.gross_income,
            net_income: income.net_income,
            vat: income.vat,
            wages,
            fixed_costs,
            sundries,
            profit: profit_for(income.net_income, wages, fixed_costs, sundries),
            updated_at: Some(updated_at),
        }
    }

    /// Number of cost fields (`wages`, `fixedCosts`, `sundries`) that are non-zero.
    pub fn completeness_score(&self) -> u8 {
        [self.wages, self.fixed_costs, self.sundries]
            .iter()
            .filter(|value| **value != 0.0)
            .count() as u8
    }

    pub fn costs(&self) -> f64 {
        self.wages + self.fixed_costs + self.sundries
    }

    /// Whether the month shows any takings or profit.
    pub fn has_trading_data(&self) -> bool {
        self.net_income != 0.0 || self.profit != 0.0
    }

    /// Field-wise equality ignoring `updatedAt`.
    pub fn same_figures(&self, other: &MonthlySummary) -> bool {
        self.month == other.month
            && self.gross_income == other.gross_income
            && self.net_income == other.net_income
            && self.vat == other.vat
            && self.wages == other.wages
            && self.fixed_costs == other.fixed_costs
            && self.sundries == other.sundries
            && self.profit == other.profit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn october() -> MonthKey {
        "2024-10".parse().unwrap()
    }

    #[test]
    fn profit_subtracts_each_cost_once() {
        let income = IncomeTotals {
            gross_income: 12000.0,
            net_income: 10000.0,
            vat: 500.0,
        };
        let summary = MonthlySummary::new(october(), income, 3000.0, 400.0, 50.0, Utc::now());
        assert_eq!(summary.profit, 6550.0);
        assert_eq!(summary.costs(), 3450.0);
        assert!(summary.has_trading_data());
    }

    #[test]
    fn completeness_counts_non_zero_costs() {
        let mut summary =
            MonthlySummary::new(october(), IncomeTotals::default(), 0.0, 0.0, 0.0, Utc::now());
        assert_eq!(summary.completeness_score(), 0);
        summary.wages = 10.0;
        summary.sundries = 1.0;
        assert_eq!(summary.completeness_score(), 2);
    }

    #[test]
    fn same_figures_ignores_timestamp() {
        let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let a = MonthlySummary::new(october(), IncomeTotals::default(), 5.0, 0.0, 0.0, first);
        let b = MonthlySummary::new(october(), IncomeTotals::default(), 5.0, 0.0, 0.0, second);
        assert_ne!(a, b);
        assert!(a.same_figures(&b));
    }

    #[test]
    fn serializes_with_stored_field_names() {
        let summary =
            MonthlySummary::new(october(), IncomeTotals::default(), 1.0, 2.0, 3.0, Utc::now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["month"], "2024-10");
        assert_eq!(json["fixedCosts"], 2.0);
        assert!(json.get("updatedAt").is_some());
    }
}
