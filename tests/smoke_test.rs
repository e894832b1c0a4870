use pandl_core::{engine::CoreError, init, init_with_filter, PnlLedger};

#[test]
fn init_is_idempotent() {
    init();
    init_with_filter("pandl_engine=debug");
}

#[test]
fn in_memory_ledger_recomputes_an_empty_year() {
    let ledger = PnlLedger::in_memory("smoke");
    let year = "2024-25".parse().expect("fiscal year");
    let summaries = ledger.recompute_year(year).expect("recompute");
    assert_eq!(summaries.len(), 12);
    assert!(summaries.iter().all(|s| s.profit == 0.0));
}

#[test]
fn comparing_nothing_is_an_error() {
    let ledger = PnlLedger::in_memory("smoke");
    assert!(matches!(
        ledger.compare_years(&[]),
        Err(CoreError::InvalidOperation(_))
    ));
}
