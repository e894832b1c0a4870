//! Evaluation of fixed-cost schedules against calendar months.

use chrono::Datelike;
use pandl_domain::{CostStatus, FixedCost, MonthKey, Schedule};

/// One cost's share of a month's fixed-cost total.
#[derive(Debug, Clone, PartialEq)]
pub struct CostContribution {
    pub service_id: String,
    pub service: String,
    pub occurrences: u32,
    pub amount: f64,
}

/// Stateless helpers that turn recurring definitions into monthly amounts.
pub struct RecurrenceService;

impl RecurrenceService {
    /// Cancellation is month-granular: a cost cancelled at any point in a
    /// month still accrues for that whole month.
    pub fn is_active_in(cost: &FixedCost, month: MonthKey) -> bool {
        match cost.status {
            CostStatus::Active => true,
            CostStatus::Cancelled { date } => month <= MonthKey::of(date),
        }
    }

    /// How many times `schedule` falls due in `month`.
    pub fn occurrences(schedule: &Schedule, month: MonthKey) -> u32 {
        match schedule {
            Schedule::Weekly { day } => {
                month.days().filter(|date| date.weekday() == *day).count() as u32
            }
            Schedule::Monthly { day_of_month } => {
                u32::from(*day_of_month <= month.days_in_month())
            }
            Schedule::Yearly { date } => u32::from(date.month() == month.month()),
            Schedule::Legacy => 1,
        }
    }

    /// Amount `cost` contributes to `month`, zero when cancelled before it.
    pub fn contribution(cost: &FixedCost, month: MonthKey) -> f64 {
        if !Self::is_active_in(cost, month) {
            return 0.0;
        }
        cost.cost * f64::from(Self::occurrences(&cost.schedule, month))
    }

    pub fn sum_fixed_costs(costs: &[FixedCost], month: MonthKey) -> f64 {
        costs
            .iter()
            .fold(0.0, |total, cost| total + Self::contribution(cost, month))
    }

    /// Per-cost detail behind [`RecurrenceService::sum_fixed_costs`], skipping zero rows.
    pub fn breakdown(costs: &[FixedCost], month: MonthKey) -> Vec<CostContribution> {
        costs
            .iter()
            .filter(|cost| Self::is_active_in(cost, month))
            .map(|cost| {
                let occurrences = Self::occurrences(&cost.schedule, month);
                CostContribution {
                    service_id: cost.service_id.clone(),
                    service: cost.service.clone(),
                    occurrences,
                    amount: cost.cost * f64::from(occurrences),
                }
            })
            .filter(|row| row.occurrences > 0)
            .collect()
    }

    /// Definitions stored without a frequency.
    pub fn legacy_costs(costs: &[FixedCost]) -> Vec<&FixedCost> {
        costs
            .iter()
            .filter(|cost| cost.schedule == Schedule::Legacy)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(raw: &str) -> MonthKey {
        raw.parse().unwrap()
    }

    fn weekly_friday(cost: f64) -> FixedCost {
        FixedCost::new("Cleaner", cost, false, Schedule::weekly(5).unwrap()).unwrap()
    }

    #[test]
    fn weekly_counts_matching_weekdays() {
        // October 2024 has four Fridays, November 2024 has five.
        let cleaner = weekly_friday(100.0);
        assert_eq!(RecurrenceService::contribution(&cleaner, month("2024-10")), 400.0);
        assert_eq!(RecurrenceService::contribution(&cleaner, month("2024-11")), 500.0);
    }

    #[test]
    fn monthly_skips_months_that_are_too_short() {
        let cost = FixedCost::new("Insurance", 30.0, false, Schedule::monthly(31).unwrap()).unwrap();
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-01")), 30.0);
        assert_eq!(RecurrenceService::contribution(&cost, month("2024-11")), 0.0);
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-02")), 0.0);
    }

    #[test]
    fn yearly_charges_only_its_month() {
        let cost = FixedCost::new("Licence", 240.0, true, Schedule::yearly("03-15").unwrap()).unwrap();
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-03")), 240.0);
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-04")), 0.0);
    }

    #[test]
    fn cancelled_cost_accrues_through_its_cancellation_month() {
        let mut cost = FixedCost::new("Rent", 1000.0, false, Schedule::monthly(1).unwrap()).unwrap();
        cost.cancel(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(RecurrenceService::contribution(&cost, month("2024-12")), 1000.0);
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-01")), 1000.0);
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-02")), 0.0);
    }

    #[test]
    fn breakdown_matches_sum() {
        let costs = vec![
            weekly_friday(100.0),
            FixedCost::new("Rent", 1000.0, false, Schedule::monthly(1).unwrap()).unwrap(),
            FixedCost::new("Licence", 240.0, false, Schedule::yearly("03-15").unwrap()).unwrap(),
        ];
        let october = month("2024-10");
        let rows = RecurrenceService::breakdown(&costs, october);
        assert_eq!(rows.len(), 2);
        let total: f64 = rows.iter().map(|row| row.amount).sum();
        assert_eq!(total, RecurrenceService::sum_fixed_costs(&costs, october));
        assert_eq!(total, 1400.0);
    }

    #[test]
    fn legacy_costs_charge_monthly() {
        let mut cost = weekly_friday(20.0);
        cost.schedule = Schedule::Legacy;
        assert_eq!(RecurrenceService::contribution(&cost, month("2025-02")), 20.0);
        assert_eq!(RecurrenceService::legacy_costs(std::slice::from_ref(&cost)).len(), 1);
    }
}
