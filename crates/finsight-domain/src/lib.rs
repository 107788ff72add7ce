//! finsight-domain
//!
//! Pure domain models (Category, Transaction, Budget, SavingsGoal, InsightSnapshot).
//! No I/O, no storage. Only data types, core enums, and invariant-preserving helpers.

pub mod budget;
pub mod category;
pub mod common;
pub mod goal;
pub mod insight;
pub mod ledger;
pub mod timestamp;
pub mod transaction;

pub use budget::*;
pub use category::*;
pub use common::*;
pub use goal::*;
pub use insight::*;
pub use ledger::*;
pub use transaction::*;
