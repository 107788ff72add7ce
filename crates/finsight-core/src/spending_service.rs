//! Sums transactions into per-category and per-group totals over half-open ranges.

use std::collections::BTreeMap;

use uuid::Uuid;

use finsight_domain::{AllocationGroup, CategoryKind, DateRange, Transaction, TransactionStatus};

/// Which transactions count toward a sum. Soft-deleted transactions never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpendFilter {
    pub include_pending: bool,
}

impl SpendFilter {
    /// Completed transactions only.
    pub fn completed() -> Self {
        Self::default()
    }

    pub fn with_pending() -> Self {
        Self {
            include_pending: true,
        }
    }

    pub fn admits(&self, txn: &Transaction) -> bool {
        if txn.is_deleted() || !txn.amount.is_finite() {
            return false;
        }
        match txn.status {
            TransactionStatus::Completed => true,
            TransactionStatus::Pending => self.include_pending,
            TransactionStatus::Failed | TransactionStatus::Cancelled => false,
        }
    }
}

pub struct SpendingAggregator;

impl SpendingAggregator {
    /// Completed expense spend for one category within `range`.
    pub fn sum_by_category(txns: &[Transaction], category_id: Uuid, range: &DateRange) -> f64 {
        Self::sum_by_category_with(txns, category_id, range, SpendFilter::completed())
    }

    pub fn sum_by_category_with(
        txns: &[Transaction],
        category_id: Uuid,
        range: &DateRange,
        filter: SpendFilter,
    ) -> f64 {
        Self::matching(txns, CategoryKind::Expense, range, filter)
            .filter(|txn| txn.category_id == category_id)
            .map(Transaction::magnitude)
            .sum()
    }

    /// Completed expense spend across every category of the group within `range`.
    pub fn sum_by_group(txns: &[Transaction], group: &AllocationGroup, range: &DateRange) -> f64 {
        Self::sum_by_group_with(txns, group, range, SpendFilter::completed())
    }

    pub fn sum_by_group_with(
        txns: &[Transaction],
        group: &AllocationGroup,
        range: &DateRange,
        filter: SpendFilter,
    ) -> f64 {
        Self::matching(txns, CategoryKind::Expense, range, filter)
            .filter(|txn| group.contains(txn.category_id))
            .map(Transaction::magnitude)
            .sum()
    }

    /// Absolute totals of `kind` keyed by category id.
    pub fn totals_by_category(
        txns: &[Transaction],
        kind: CategoryKind,
        range: &DateRange,
        filter: SpendFilter,
    ) -> BTreeMap<Uuid, f64> {
        let mut totals = BTreeMap::new();
        for txn in Self::matching(txns, kind, range, filter) {
            *totals.entry(txn.category_id).or_insert(0.0) += txn.magnitude();
        }
        totals
    }

    /// Absolute total of all transactions of `kind` within `range`.
    pub fn total(
        txns: &[Transaction],
        kind: CategoryKind,
        range: &DateRange,
        filter: SpendFilter,
    ) -> f64 {
        Self::matching(txns, kind, range, filter)
            .map(Transaction::magnitude)
            .sum()
    }

    fn matching<'a>(
        txns: &'a [Transaction],
        kind: CategoryKind,
        range: &'a DateRange,
        filter: SpendFilter,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        txns.iter().filter(move |txn| {
            txn.kind == kind && range.contains(txn.created_at) && filter.admits(txn)
        })
    }
}
