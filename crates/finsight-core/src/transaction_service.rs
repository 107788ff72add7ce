//! Transaction validation, status lifecycle, soft deletion, and recurrence expansion.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use finsight_domain::{Transaction, TransactionStatus};

use crate::{CategoryCatalog, CoreError};

/// Upper bound on occurrences materialized by a single expansion.
const MAX_OCCURRENCES: usize = 5_000;

pub struct TransactionService;

impl TransactionService {
    /// Checks amount sanity and that the category exists with a matching type.
    pub fn validate(catalog: &CategoryCatalog, txn: &Transaction) -> Result<(), CoreError> {
        if !txn.amount.is_finite() {
            return Err(CoreError::Validation(format!(
                "transaction {} has a non-finite amount",
                txn.id
            )));
        }
        if txn.amount == 0.0 {
            return Err(CoreError::Validation(format!(
                "transaction {} has a zero amount",
                txn.id
            )));
        }
        catalog.validate_transaction(txn)
    }

    pub fn transition(txn: &mut Transaction, next: TransactionStatus) -> Result<(), CoreError> {
        txn.transition(next)?;
        debug!(transaction = %txn.id, status = %next, "transaction status changed");
        Ok(())
    }

    /// Marks the transaction deleted. Returns `false` when it already was.
    pub fn soft_delete(txn: &mut Transaction, at: DateTime<Utc>) -> bool {
        if txn.is_deleted() {
            return false;
        }
        txn.deleted_at = Some(at);
        true
    }

    /// Replaces tags with the trimmed, de-duplicated, non-empty input in order.
    pub fn set_tags<I, S>(txn: &mut Transaction, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !cleaned.iter().any(|existing| existing == tag) {
                cleaned.push(tag.to_string());
            }
        }
        txn.tags = cleaned;
    }

    /// Materializes pending occurrences of a recurring transaction strictly before
    /// `until` and no later than the recurrence end date. Occurrences already present
    /// in `existing` (same parent and timestamp) are not produced again.
    pub fn expand_recurrence(
        txn: &Transaction,
        existing: &[Transaction],
        until: DateTime<Utc>,
    ) -> Vec<Transaction> {
        let Some(recurrence) = txn.recurrence.as_ref() else {
            return Vec::new();
        };
        if txn.is_deleted() {
            return Vec::new();
        }

        let already: Vec<DateTime<Utc>> = existing
            .iter()
            .filter(|other| other.recurrence_parent == Some(txn.id))
            .map(|other| other.created_at)
            .collect();

        let mut occurrences = Vec::new();
        for n in 1.. {
            let Some(at) = recurrence.interval.nth_timestamp(txn.created_at, n) else {
                break;
            };
            if at >= until || !recurrence.allows(at) || occurrences.len() >= MAX_OCCURRENCES {
                break;
            }
            if !already.contains(&at) {
                occurrences.push(Self::occurrence_of(txn, at));
            }
        }
        debug!(
            transaction = %txn.id,
            generated = occurrences.len(),
            "recurrence expanded"
        );
        occurrences
    }

    fn occurrence_of(parent: &Transaction, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            amount: parent.amount,
            kind: parent.kind,
            description: parent.description.clone(),
            category_id: parent.category_id,
            created_at: at,
            status: TransactionStatus::Pending,
            recurrence: None,
            recurrence_parent: Some(parent.id),
            tags: parent.tags.clone(),
            deleted_at: None,
        }
    }
}
