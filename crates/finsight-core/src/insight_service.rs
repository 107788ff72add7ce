//! Builds the insight snapshot from one consistent copy of the ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use finsight_config::InsightSettings;
use finsight_domain::{
    Budget, CategoryKind, EntityKind, GroupRole, InsightSnapshot, Ledger, MonthKey, SavingsGoal,
    SkippedEntity, SpendingTrends, Transaction, UnusualSpending,
};

use crate::{
    BudgetAllocator, BudgetService, CategoryCatalog, Clock, CoreError, GoalService, LedgerStore,
    SpendFilter, SpendingAggregator, TransactionService, TrendAnalyzer,
};

pub struct InsightService;

impl InsightService {
    /// Recomputes every insight from a fresh snapshot of `store` and writes the result
    /// back with a single `put_insights`. Nothing else in the store is modified.
    pub fn update_insights(
        store: &mut dyn LedgerStore,
        settings: &InsightSettings,
        clock: &dyn Clock,
    ) -> Result<InsightSnapshot, CoreError> {
        let ledger = store.snapshot()?;
        let snapshot = Self::build(&ledger, settings, clock.now());
        store.put_insights(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Pure recomputation over an already captured ledger.
    pub fn build(ledger: &Ledger, settings: &InsightSettings, now: DateTime<Utc>) -> InsightSnapshot {
        debug!(
            transactions = ledger.transactions.len(),
            categories = ledger.categories.len(),
            goals = ledger.goals.len(),
            "rebuilding insights"
        );
        let mut skipped = Vec::new();
        let filter = SpendFilter {
            include_pending: settings.include_pending,
        };

        let (catalog, rejected) = CategoryCatalog::load_lenient(&ledger.categories);
        for (id, err) in rejected {
            skip(&mut skipped, EntityKind::Category, id, &err);
        }
        let txns = valid_transactions(&ledger.transactions, &catalog, &mut skipped);

        let current = MonthKey::of(now);
        let window = current.trailing(settings.trend_window_months.max(1) as usize);

        // Trends per category over the trailing window.
        let series = TrendAnalyzer::category_series(&txns, &window, filter);
        let trends = SpendingTrends {
            monthly: TrendAnalyzer::monthly_totals_in(&txns, &window, filter),
            category_trends: TrendAnalyzer::category_trends(&series, settings.trend_epsilon_percent),
        };

        // Goal progress.
        let mut savings_progress = BTreeMap::new();
        let mut committed = 0.0;
        for goal in &ledger.goals {
            match goal_progress(goal, &catalog) {
                Ok(percent) => {
                    savings_progress.insert(goal.id, percent);
                    committed += GoalService::monthly_commitment(goal);
                }
                Err(err) => skip(&mut skipped, EntityKind::Goal, goal.id, &err),
            }
        }

        // Unusual spending against each category's own trailing average.
        let mut unusual_spending: Vec<UnusualSpending> = series
            .iter()
            .filter_map(|(category_id, values)| {
                TrendAnalyzer::detect_unusual(
                    *category_id,
                    values,
                    settings.unusual_spending_threshold_percent,
                )
            })
            .collect();
        unusual_spending.sort_by(|a, b| {
            b.percentage_increase
                .total_cmp(&a.percentage_increase)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });

        let month = current.range();
        let monthly_spending_by_category =
            SpendingAggregator::totals_by_category(&txns, CategoryKind::Expense, &month, filter);
        let income = SpendingAggregator::total(&txns, CategoryKind::Income, &month, filter);
        let essential = match usable_active_budget(&ledger.budgets, now, &mut skipped) {
            Some(budget) => essential_spend(budget, &txns, current, filter),
            None => 0.0,
        };
        let guilt_free_balance = income - essential - committed;

        let net = TrendAnalyzer::monthly_net(&txns, &window, filter);
        let projected_savings = if net.is_empty() {
            0.0
        } else {
            net.values().sum::<f64>() / net.len() as f64
        };

        debug!(
            unusual = unusual_spending.len(),
            skipped = skipped.len(),
            "insights rebuilt"
        );
        InsightSnapshot {
            guilt_free_balance,
            projected_savings,
            monthly_spending_by_category,
            savings_progress,
            unusual_spending,
            trends,
            skipped,
            last_updated: now,
        }
    }
}

fn skip(skipped: &mut Vec<SkippedEntity>, entity: EntityKind, id: Uuid, err: &CoreError) {
    warn!(entity = %entity, id = %id, "skipping {} while rebuilding insights: {}", entity, err);
    skipped.push(SkippedEntity {
        entity,
        id,
        reason: err.to_string(),
    });
}

fn valid_transactions(
    all: &[Transaction],
    catalog: &CategoryCatalog,
    skipped: &mut Vec<SkippedEntity>,
) -> Vec<Transaction> {
    let mut valid = Vec::with_capacity(all.len());
    for txn in all.iter().filter(|txn| !txn.is_deleted()) {
        match TransactionService::validate(catalog, txn) {
            Ok(()) => valid.push(txn.clone()),
            Err(err) => skip(skipped, EntityKind::Transaction, txn.id, &err),
        }
    }
    valid
}

fn goal_progress(goal: &SavingsGoal, catalog: &CategoryCatalog) -> Result<f64, CoreError> {
    catalog.require(goal.category_id)?;
    GoalService::progress(goal)
}

fn usable_active_budget<'a>(
    budgets: &'a [Budget],
    now: DateTime<Utc>,
    skipped: &mut Vec<SkippedEntity>,
) -> Option<&'a Budget> {
    let budget = BudgetService::active_budget(budgets, now)?;
    match BudgetAllocator::validate_groups(&budget.category_allocations) {
        Ok(()) => Some(budget),
        Err(err) => {
            skip(skipped, EntityKind::Budget, budget.id, &err);
            None
        }
    }
}

fn essential_spend(
    budget: &Budget,
    txns: &[Transaction],
    month: MonthKey,
    filter: SpendFilter,
) -> f64 {
    let range = month.range();
    budget
        .category_allocations
        .iter()
        .filter(|group| group.role == GroupRole::Essential)
        .map(|group| SpendingAggregator::sum_by_group_with(txns, group, &range, filter))
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use finsight_domain::{Category, TransactionStatus};

    use super::*;
    use crate::{FixedClock, InMemoryLedgerStore};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn broken_entities_are_skipped_not_fatal() {
        let mut ledger = Ledger::new();
        let dining = ledger.add_category(Category::new("Dining", CategoryKind::Expense));
        ledger.add_transaction(Transaction::completed_expense(25.0, dining, at(2024, 6, 3)));
        let ghost = ledger.add_transaction(Transaction::completed_expense(
            40.0,
            Uuid::new_v4(),
            at(2024, 6, 3),
        ));
        let mut bad_goal = SavingsGoal::new("Bike", 0.0, at(2024, 12, 1), dining);
        bad_goal.current_amount = 10.0;
        let bad_goal = ledger.add_goal(bad_goal);

        let snapshot = InsightService::build(&ledger, &InsightSettings::default(), at(2024, 6, 20));

        assert_eq!(snapshot.monthly_spending_by_category[&dining], 25.0);
        let skipped: Vec<Uuid> = snapshot.skipped.iter().map(|s| s.id).collect();
        assert_eq!(skipped, vec![ghost, bad_goal]);
        assert!(snapshot.savings_progress.is_empty());
    }

    #[test]
    fn update_writes_only_the_snapshot() {
        let mut ledger = Ledger::new();
        let rent = ledger.add_category(Category::new("Rent", CategoryKind::Expense));
        let mut pending = Transaction::new(CategoryKind::Expense, 900.0, rent, at(2024, 6, 1));
        pending.status = TransactionStatus::Pending;
        ledger.add_transaction(pending);
        let mut store = InMemoryLedgerStore::from_ledger(ledger.clone());

        let clock = FixedClock(at(2024, 6, 15));
        let snapshot =
            InsightService::update_insights(&mut store, &InsightSettings::default(), &clock).unwrap();

        assert_eq!(store.version(), 1);
        assert_eq!(store.ledger().transactions, ledger.transactions);
        assert_eq!(store.ledger().insights.as_ref(), Some(&snapshot));
        assert!(snapshot.monthly_spending_by_category.is_empty());
        assert_eq!(snapshot.last_updated, at(2024, 6, 15));
    }
}
