use thiserror::Error;
use uuid::Uuid;

use finsight_domain::{
    CategoryKind, DateRangeError, StatusTransitionError, TransactionStatus,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),
    #[error("Assigning parent {parent} to category {category} would create a cycle")]
    CategoryCycle { category: Uuid, parent: Uuid },
    #[error("Category {category} is {expected} but the transaction is {actual}")]
    CategoryKindMismatch {
        category: Uuid,
        expected: CategoryKind,
        actual: CategoryKind,
    },
    #[error("Cannot move transaction from {from} to {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    #[error("Activating budget {requested} replaces active budget {active}; confirmation required")]
    ActivationRequiresConfirmation { requested: Uuid, active: Uuid },
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),
    #[error("Budget not found: {0}")]
    BudgetNotFound(Uuid),
    #[error("Savings goal not found: {0}")]
    GoalNotFound(Uuid),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`CoreError`] for collaborators deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_)
            | CoreError::InvalidAllocation(_)
            | CoreError::CategoryCycle { .. }
            | CoreError::CategoryKindMismatch { .. }
            | CoreError::InvalidStatusTransition { .. }
            | CoreError::ActivationRequiresConfirmation { .. } => ErrorKind::Validation,
            CoreError::CategoryNotFound(_)
            | CoreError::BudgetNotFound(_)
            | CoreError::GoalNotFound(_)
            | CoreError::TransactionNotFound(_) => ErrorKind::NotFound,
            CoreError::Storage(_) | CoreError::Serde(_) | CoreError::Io(_) => ErrorKind::Storage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<DateRangeError> for CoreError {
    fn from(err: DateRangeError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<StatusTransitionError> for CoreError {
    fn from(err: StatusTransitionError) -> Self {
        CoreError::InvalidStatusTransition {
            from: err.from,
            to: err.to,
        }
    }
}
