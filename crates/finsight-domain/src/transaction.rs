//! Domain models for ledger transactions and recurrence descriptors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{category::CategoryKind, common::TimeInterval};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    #[serde(with = "crate::timestamp::flexible")]
    pub created_at: DateTime<Utc>,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_parent: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        kind: CategoryKind,
        amount: f64,
        category_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            kind,
            description: String::new(),
            category_id,
            created_at,
            status: TransactionStatus::Pending,
            recurrence: None,
            recurrence_parent: None,
            tags: Vec::new(),
            deleted_at: None,
        }
    }

    /// Convenience constructor for an already settled expense.
    pub fn completed_expense(amount: f64, category_id: Uuid, created_at: DateTime<Utc>) -> Self {
        let mut txn = Self::new(CategoryKind::Expense, amount, category_id, created_at);
        txn.status = TransactionStatus::Completed;
        txn
    }

    /// Convenience constructor for an already settled income entry.
    pub fn completed_income(amount: f64, category_id: Uuid, created_at: DateTime<Utc>) -> Self {
        let mut txn = Self::new(CategoryKind::Income, amount, category_id, created_at);
        txn.status = TransactionStatus::Completed;
        txn
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Magnitude used by every aggregation; direction comes from `kind`.
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Moves the transaction to `next`, enforcing the status lifecycle.
    pub fn transition(&mut self, next: TransactionStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
/// Enumerates the lifecycle state of a transaction.
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(self, TransactionStatus::Pending) && next.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransitionError {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

impl fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move transaction from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for StatusTransitionError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
/// Frequency plus optional end date attached to a repeating transaction.
pub struct Recurrence {
    pub interval: TimeInterval,
    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<DateTime<Utc>>,
}

impl Recurrence {
    pub fn new(interval: TimeInterval) -> Self {
        Self {
            interval,
            end_date: None,
        }
    }

    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Whether an occurrence at `candidate` is still inside the series.
    pub fn allows(&self, candidate: DateTime<Utc>) -> bool {
        self.end_date.map_or(true, |end| candidate <= end)
    }
}
