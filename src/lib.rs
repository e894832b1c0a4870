#![doc(test(attr(deny(warnings))))]

//! Profit-and-loss engine for a small trading business: fiscal-year
//! calendar, recurring cost evaluation, monthly summaries, duplicate
//! reconciliation and year-on-year comparison.

pub mod errors;
pub mod pnl_ledger;
pub mod utils;

pub use errors::PnlError;
pub use pnl_ledger::PnlLedger;
pub use pandl_config as config;
pub use pandl_domain as domain;
pub use pandl_engine as engine;
pub use pandl_storage_json as storage_json;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter and logs build metadata.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_DIRECTIVES);
}

/// Like [`init`], adding comma-separated `directives` (e.g. a configured
/// `log_filter`) to `RUST_LOG`.
pub fn init_with_filter(directives: &str) {
    INIT_TRACING.call_once(|| {
        utils::tracing_setup::install(directives);
        let build = utils::build_info::current();
        tracing::info!(
            version = build.version,
            git = build.git_hash,
            built = build.timestamp,
            profile = build.profile,
            "P&L core tracing initialized."
        );
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init_with_filter("pandl_engine=debug");
    }
}
