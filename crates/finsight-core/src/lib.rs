//! finsight-core
//!
//! Budget allocation, spending aggregation, compliance, trend analysis, and insight snapshots.
//! Depends on finsight-domain. No UI, no terminal I/O, no direct storage interactions.

pub mod allocation_service;
pub mod budget_service;
pub mod category_service;
pub mod compliance_service;
pub mod error;
pub mod goal_service;
pub mod insight_service;
pub mod spending_service;
pub mod store;
pub mod time;
pub mod transaction_service;
pub mod trend_service;

pub use allocation_service::*;
pub use budget_service::*;
pub use category_service::*;
pub use compliance_service::*;
pub use error::{CoreError, ErrorKind};
pub use goal_service::*;
pub use insight_service::*;
pub use spending_service::*;
pub use store::*;
pub use time::*;
pub use transaction_service::*;
pub use trend_service::*;
