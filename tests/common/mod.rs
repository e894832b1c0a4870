use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use pandl_core::{
    config::{Config, ConfigManager},
    engine::FixedClock,
    PnlLedger,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a ledger over a JSON store in its own directory, with the clock
/// pinned to 1 March 2025.
pub fn setup_test_env() -> (PnlLedger, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    let config = Config {
        user_id: "owner".into(),
        data_root: Some(base.join("data")),
        ..Config::default()
    };
    config_manager.save(&config).expect("save config");

    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
    let ledger = PnlLedger::open(&config)
        .expect("open ledger")
        .with_clock(Arc::new(clock));
    (ledger, config_manager)
}
