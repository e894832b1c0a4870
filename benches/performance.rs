use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pandl_core::{
    domain::{DailyFigure, FiscalYear, FixedCost, Schedule, SundryExpense, WageRecord},
    engine::{ComparisonService, FixedClock, MemoryDocumentStore},
    PnlLedger,
};

fn seeded_ledger(years: &[FiscalYear]) -> PnlLedger {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    let ledger = PnlLedger::new(
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(clock),
        "bench",
    );
    for year in years {
        let repo = ledger.year(*year);
        let start = year.dates().start;
        for offset in 0..365 {
            let day = start + Duration::days(offset);
            let figure = DailyFigure::from_gross_total(day, 800.0 + (offset % 50) as f64)
                .expect("figure");
            repo.save_daily_figure(&figure).expect("save figure");
            if offset % 3 == 0 {
                let sundry = SundryExpense::new(day, 12.5, 2.0).expect("sundry");
                repo.add_sundry(&sundry).expect("save sundry");
            }
        }
        for month in year.months() {
            repo.save_wage(&WageRecord::new(month, 2200.0, 100.0, 400.0, 120.0, 0.0))
                .expect("save wage");
        }
        let costs = [
            FixedCost::new("Rent", 1500.0, false, Schedule::monthly(1).expect("monthly")),
            FixedCost::new("Cleaner", 90.0, false, Schedule::weekly(5).expect("weekly")),
            FixedCost::new("Licence", 300.0, true, Schedule::yearly("04-01").expect("yearly")),
        ];
        for cost in costs {
            repo.save_fixed_cost(&cost.expect("cost")).expect("save cost");
        }
    }
    ledger
}

fn bench_recompute(c: &mut Criterion) {
    let year = FiscalYear::new(2024).expect("fiscal year");
    let ledger = seeded_ledger(&[year]);

    c.bench_function("recompute_year_365_days", |b| {
        b.iter(|| {
            let summaries = ledger.recompute_year(black_box(year)).expect("recompute");
            black_box(summaries);
        })
    });
}

fn bench_comparison(c: &mut Criterion) {
    let years: Vec<FiscalYear> = (2021..=2024)
        .map(|start| FiscalYear::new(start).expect("fiscal year"))
        .collect();
    let ledger = seeded_ledger(&years);
    let loaded: Vec<_> = years
        .iter()
        .map(|year| (*year, ledger.recompute_year(*year).expect("recompute")))
        .collect();

    c.bench_function("compare_four_years", |b| {
        b.iter(|| black_box(ComparisonService::build(black_box(&loaded))))
    });

    let first = NaiveDate::from_ymd_opt(2021, 10, 1).expect("date");
    c.bench_function("fiscal_year_lookup", |b| {
        b.iter(|| {
            (0..1461)
                .map(|offset| FiscalYear::containing(first + Duration::days(offset)))
                .filter(|fy| fy.start_year() == 2023)
                .count()
        })
    });
}

criterion_group!(benches, bench_recompute, bench_comparison);
criterion_main!(benches);
