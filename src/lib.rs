#![doc(test(attr(deny(warnings))))]

//! Finsight Engine turns a ledger of categorized transactions into rule-based
//! budget allocations, compliance figures and spending insights.

pub mod engine;
pub mod errors;
pub mod utils;

pub use engine::InsightEngine;
pub use errors::EngineError;
pub use finsight_config::{Config, ConfigManager, InsightSettings};
pub use finsight_core::{ActivationConfirmation, Clock, FixedClock, LedgerStore, SystemClock};
pub use finsight_storage_json::JsonLedgerStore;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Finsight engine tracing initialized.");
    });
}
