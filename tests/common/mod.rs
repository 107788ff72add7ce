#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::{DateTime, TimeZone, Utc};
use finsight_engine::{
    Config, ConfigManager, FixedClock, InsightEngine, InsightSettings, JsonLedgerStore,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Creates an engine over a fresh JSON store whose clock is frozen at `now`.
pub fn setup_test_env(now: DateTime<Utc>) -> (InsightEngine, ConfigManager, PathBuf) {
    let base = temp_base();
    let ledger_dir = base.join("ledger");
    let store = JsonLedgerStore::new(ledger_dir.clone()).expect("create json ledger store");
    let engine = InsightEngine::with_clock(
        Box::new(store),
        InsightSettings::default(),
        Arc::new(FixedClock(now)),
    );
    let config_manager =
        ConfigManager::with_base_dir(base).expect("create config manager for temp dir");
    (engine, config_manager, ledger_dir)
}

/// Config pointing at a unique temporary data directory.
pub fn temp_config() -> Config {
    Config {
        data_dir: Some(temp_base().join("data")),
        ..Config::default()
    }
}
