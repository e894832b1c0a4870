use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use crate::{
    aggregation_service::AggregationService,
    comparison_service::ComparisonService,
    memory_store::MemoryDocumentStore,
    reconcile_service::ReconcileService,
    recurrence_service::RecurrenceService,
    repository::{SourceReader, YearRepository},
    rollover_service::RolloverService,
    storage::{Collection, DocumentStore, WriteMode},
    time::FixedClock,
    CoreError,
};
use pandl_domain::{
    DailyFigure, FiscalYear, FixedCost, MonthKey, MonthlySummary, Schedule, SundryExpense,
    WageRecord,
};

const USER: &str = "owner";

fn fy() -> FiscalYear {
    "2024-25".parse().expect("fiscal year")
}

fn month(raw: &str) -> MonthKey {
    raw.parse().expect("month key")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
}

/// Seeds October 2024 with netIncome 10000, vat 500, wages 3000,
/// a Friday cost of 100 and 50 of sundries.
fn seed_october(repo: &YearRepository<'_>) {
    for (day, net, vat) in [(1, 4000.0, 200.0), (15, 6000.0, 300.0)] {
        let figure = DailyFigure {
            date: date(2024, 10, day),
            gross_total: 0.0,
            net_total: 0.0,
            fee: 0.0,
            gross_income: net + vat,
            net_income: net,
            vat,
            abbies_pay: 0.0,
            no_trade: false,
        };
        repo.save_daily_figure(&figure).expect("save figure");
    }
    repo.save_wage(&WageRecord::new(month("2024-10"), 3000.0, 0.0, 0.0, 0.0, 0.0))
        .expect("save wage");
    let rent = FixedCost::new("Rent", 100.0, false, Schedule::weekly(5).expect("weekly"))
        .expect("rent");
    repo.save_fixed_cost(&rent).expect("save rent");
    for amount in [20.0, 30.0] {
        let sundry = SundryExpense::new(date(2024, 10, 9), amount, 0.0).expect("sundry");
        repo.add_sundry(&sundry).expect("add sundry");
    }
}

#[test]
fn fiscal_year_months_run_october_to_september() {
    let months = fy().months();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0].to_string(), "2024-10");
    assert_eq!(months[11].to_string(), "2025-09");
    assert!(months.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn date_membership_matches_year_bounds() {
    let year = fy();
    let dates = year.dates();
    assert_eq!(dates.start, date(2024, 10, 1));
    assert_eq!(dates.end, date(2025, 9, 30));
    assert!(year.contains(date(2024, 10, 1)));
    assert!(year.contains(date(2025, 9, 30)));
    assert!(!year.contains(date(2024, 9, 30)));
    assert!(!year.contains(date(2025, 10, 1)));
}

#[test]
fn end_to_end_october_profit() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    seed_october(&repo);

    let summary =
        AggregationService::aggregate_month(&repo, month("2024-10"), &clock()).expect("aggregate");
    assert_eq!(summary.net_income, 10000.0);
    assert_eq!(summary.vat, 500.0);
    assert_eq!(summary.wages, 3000.0);
    assert_eq!(summary.fixed_costs, 400.0);
    assert_eq!(summary.sundries, 50.0);
    assert_eq!(summary.profit, 6550.0);
    assert_eq!(
        repo.summary(month("2024-10")).expect("read summary"),
        Some(summary)
    );
}

#[test]
fn aggregation_is_idempotent() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    seed_october(&repo);

    let first = AggregationService::aggregate_month(&repo, month("2024-10"), &clock()).unwrap();
    let later = FixedClock(Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap());
    let second = AggregationService::aggregate_month(&repo, month("2024-10"), &later).unwrap();
    assert!(first.same_figures(&second));
    assert_eq!(repo.summaries().unwrap().len(), 1);
}

#[test]
fn aggregation_replaces_stale_fields() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    store
        .put(
            &repo.path(Collection::MonthlySummaries),
            "2024-11",
            json!({"month": "2024-11", "profit": 99.0, "abbiesPay": 12.0}),
            WriteMode::Replace,
        )
        .unwrap();

    AggregationService::aggregate_month(&repo, month("2024-11"), &clock()).unwrap();
    let doc = store
        .get(&repo.path(Collection::MonthlySummaries), "2024-11")
        .unwrap()
        .expect("summary document");
    assert!(doc.data.get("abbiesPay").is_none());
    assert_eq!(doc.data["profit"], 0.0);
}

#[test]
fn months_without_records_are_zero() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let summary = AggregationService::compute(&repo, month("2025-06"), clock().0).unwrap();
    assert_eq!(summary.profit, 0.0);
    assert_eq!(summary.completeness_score(), 0);
}

#[test]
fn empty_months_store_positive_zero() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let summary = AggregationService::aggregate_month(&repo, month("2025-06"), &clock()).unwrap();
    for value in [summary.fixed_costs, summary.sundries, summary.profit] {
        assert!(value.is_sign_positive(), "{value:?}");
    }
    assert!(RecurrenceService::sum_fixed_costs(&[], month("2025-06")).is_sign_positive());

    let doc = store
        .get(&repo.path(Collection::MonthlySummaries), "2025-06")
        .unwrap()
        .unwrap();
    assert_eq!(doc.data["fixedCosts"].to_string(), "0.0");
    assert_eq!(doc.data["sundries"].to_string(), "0.0");
}

#[test]
fn months_outside_the_year_are_rejected_before_reading() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let err = AggregationService::aggregate_month(&repo, month("2025-10"), &clock()).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(repo.summary_ids().unwrap().is_empty());
}

#[test]
fn profit_identity_holds_across_the_year() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    seed_october(&repo);
    let insurance = FixedCost::new("Insurance", 45.0, true, Schedule::monthly(31).unwrap()).unwrap();
    repo.save_fixed_cost(&insurance).unwrap();

    let summaries = AggregationService::recompute_year(&repo, &clock()).unwrap();
    assert_eq!(summaries.len(), 12);
    for summary in &summaries {
        assert_eq!(
            summary.profit,
            summary.net_income - summary.wages - summary.fixed_costs - summary.sundries
        );
    }
    // November has 30 days, so only the Fridays are charged.
    assert_eq!(summaries[1].fixed_costs, 500.0);
    assert_eq!(summaries[0].fixed_costs, 445.0);
}

#[test]
fn failed_recompute_keeps_written_months() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    store.fail_writes_after(3).unwrap();

    let err = AggregationService::recompute_year(&repo, &clock()).unwrap_err();
    assert!(err.is_storage());
    assert_eq!(repo.summary_ids().unwrap(), vec!["2024-10", "2024-11", "2024-12"]);

    store.restore_writes().unwrap();
    AggregationService::recompute_year(&repo, &clock()).unwrap();
    assert_eq!(repo.summary_ids().unwrap().len(), 12);
}

#[test]
fn reconcile_keeps_the_most_complete_duplicate() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let path = repo.path(Collection::MonthlySummaries);
    let docs = [
        ("dup-a", json!({"month": "2024-10", "wages": 0.0, "fixedCosts": 0.0, "sundries": 0.0})),
        ("dup-b", json!({"month": "2024-10", "wages": 10.0, "fixedCosts": 0.0, "sundries": 0.0})),
        ("dup-c", json!({"month": "2024-10", "wages": 10.0, "fixedCosts": 5.0, "sundries": 0.0})),
    ];
    for (id, data) in docs {
        store.put(&path, id, data, WriteMode::Replace).unwrap();
    }

    let report = ReconcileService::reconcile_year(&repo).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.deleted, 2);
    assert_eq!(repo.summary_ids().unwrap(), vec!["dup-c"]);

    let again = ReconcileService::reconcile_year(&repo).unwrap();
    assert_eq!(again.deleted, 0);
}

#[test]
fn reconcile_removes_unreadable_duplicates() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    seed_october(&repo);
    AggregationService::aggregate_month(&repo, month("2024-10"), &clock()).unwrap();
    let path = repo.path(Collection::MonthlySummaries);
    store
        .put(
            &path,
            "legacy-dup",
            json!({"month": "2024-10", "wages": "10", "updatedAt": {"seconds": 1}}),
            WriteMode::Replace,
        )
        .unwrap();
    store
        .put(
            &path,
            "2024-11",
            json!({"month": "2024-11", "profit": "n/a"}),
            WriteMode::Replace,
        )
        .unwrap();

    let report = ReconcileService::reconcile_year(&repo).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(repo.summary_ids().unwrap(), vec!["2024-10", "2024-11"]);

    let again = ReconcileService::reconcile_year(&repo).unwrap();
    assert_eq!(again.deleted, 0);
}

#[test]
fn rebuild_clears_strays_and_chunks_deletes() {
    let store = MemoryDocumentStore::with_max_batch_ops(4);
    let repo = YearRepository::new(&store, USER, fy());
    let path = repo.path(Collection::MonthlySummaries);
    for i in 0..10 {
        store
            .put(&path, &format!("stray-{i}"), json!({"profit": 1.0}), WriteMode::Replace)
            .unwrap();
    }
    seed_october(&repo);

    let summaries = ReconcileService::rebuild_year(&repo, &clock()).unwrap();
    assert_eq!(summaries.len(), 12);
    let ids = repo.summary_ids().unwrap();
    assert_eq!(ids.len(), 12);
    assert!(ids.iter().all(|id| !id.starts_with("stray")));
    assert_eq!(summaries[0].profit, 6550.0);
}

#[test]
fn comparison_self_heals_empty_years() {
    let store = MemoryDocumentStore::new();
    let current = YearRepository::new(&store, USER, fy());
    seed_october(&current);
    let previous = current.for_year(fy().previous());
    let figure = DailyFigure {
        net_income: 5000.0,
        ..DailyFigure::no_trade(date(2023, 10, 5))
    };
    previous.save_daily_figure(&figure).unwrap();

    let result =
        ComparisonService::compare(&store, USER, &[fy(), fy().previous()], &clock()).unwrap();
    assert_eq!(result.years, vec![fy().previous(), fy()]);
    assert_eq!(result.recomputed, vec![fy().previous(), fy()]);
    // A closed day carries no money even if a stale amount was stored.
    assert_eq!(result.per_year_totals[0].net_income, 0.0);
    assert_eq!(result.per_year_totals[1].net_income, 10000.0);
    assert_eq!(result.deltas.len(), 1);
    assert_eq!(result.deltas[0].net_income, None);

    let again = ComparisonService::compare(&store, USER, &[fy()], &clock()).unwrap();
    assert!(again.recomputed.is_empty());
}

#[test]
fn comparison_requires_a_year() {
    let store = MemoryDocumentStore::new();
    assert!(matches!(
        ComparisonService::compare(&store, USER, &[], &clock()),
        Err(CoreError::InvalidOperation(_))
    ));
}

#[test]
fn rollover_copies_active_costs_once() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let rent = FixedCost::new("Rent", 100.0, false, Schedule::weekly(5).unwrap()).unwrap();
    let mut phone = FixedCost::new("Phone", 30.0, true, Schedule::monthly(3).unwrap()).unwrap();
    phone.cancel(date(2025, 2, 1));
    repo.save_fixed_cost(&rent).unwrap();
    repo.save_fixed_cost(&phone).unwrap();

    assert!(RolloverService::needs_rollover(fy(), date(2025, 10, 1)));
    assert!(!RolloverService::needs_rollover(fy(), date(2025, 9, 30)));

    let report = RolloverService::start_next_year(&repo).unwrap();
    assert_eq!(report.copied, vec!["rent"]);
    assert_eq!(report.skipped_cancelled, vec!["phone"]);

    let next = repo.for_year(fy().next());
    let copied = next.fixed_costs().unwrap();
    assert_eq!(copied, vec![rent]);

    let again = RolloverService::start_next_year(&repo).unwrap();
    assert!(again.copied.is_empty());
    assert_eq!(again.already_present, vec!["rent"]);
}

#[test]
fn rollover_carries_costs_cancelled_inside_the_next_year() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let mut cleaner = FixedCost::new("Cleaner", 80.0, false, Schedule::monthly(1).unwrap()).unwrap();
    cleaner.cancel(date(2025, 11, 15));
    let mut alarm = FixedCost::new("Alarm", 25.0, false, Schedule::monthly(1).unwrap()).unwrap();
    alarm.cancel(date(2025, 9, 30));
    repo.save_fixed_cost(&cleaner).unwrap();
    repo.save_fixed_cost(&alarm).unwrap();

    let report = RolloverService::start_next_year(&repo).unwrap();
    assert_eq!(report.copied, vec!["cleaner"]);
    assert_eq!(report.skipped_cancelled, vec!["alarm"]);

    let next = repo.for_year(fy().next());
    assert_eq!(next.fixed_cost("cleaner").unwrap(), Some(cleaner));
    let fixed = |raw: &str| {
        AggregationService::compute(&next, month(raw), clock().0)
            .unwrap()
            .fixed_costs
    };
    assert_eq!(fixed("2025-10"), 80.0);
    assert_eq!(fixed("2025-11"), 80.0);
    assert_eq!(fixed("2025-12"), 0.0);
}

#[test]
fn cancellation_boundary_across_the_year() {
    let mut cost = FixedCost::new("Rent", 100.0, false, Schedule::monthly(1).unwrap()).unwrap();
    cost.cancel(date(2025, 3, 31));
    let contributions: Vec<f64> = fy()
        .months()
        .iter()
        .map(|m| RecurrenceService::contribution(&cost, *m))
        .collect();
    assert_eq!(&contributions[..6], &[100.0; 6]);
    assert_eq!(&contributions[6..], &[0.0; 6]);
}

#[test]
fn summary_documents_round_trip_through_the_store() {
    let store = MemoryDocumentStore::new();
    let repo = YearRepository::new(&store, USER, fy());
    let summary = MonthlySummary::new(
        month("2025-01"),
        Default::default(),
        1.0,
        2.0,
        3.0,
        clock().0,
    );
    repo.replace_summary(&summary).unwrap();
    assert_eq!(repo.fiscal_year(), fy());
    assert_eq!(repo.summary(month("2025-01")).unwrap(), Some(summary));
}
