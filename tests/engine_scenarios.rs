mod common;

use std::sync::Arc;

use common::{at, setup_test_env};
use finsight_core::{CoreError, ErrorKind};
use finsight_domain::{
    BudgetPeriodType, BudgetRule, BudgetStatus, Category, CategoryKind, DateRange, FixedRule,
    Recurrence, SavingsGoal, TimeInterval, Transaction, TransactionStatus,
};
use finsight_engine::{
    ActivationConfirmation, EngineError, FixedClock, InsightEngine, InsightSettings,
    JsonLedgerStore, LedgerStore,
};

fn year_2024() -> DateRange {
    DateRange::new(at(2024, 1, 1), at(2025, 1, 1)).expect("range")
}

#[test]
fn budget_lifecycle_through_the_facade() {
    let (mut engine, _, _) = setup_test_env(at(2024, 3, 15));
    let groceries = engine
        .add_category(Category::new("Groceries", CategoryKind::Expense))
        .expect("groceries");
    let salary = engine
        .add_category(Category::new("Salary", CategoryKind::Income))
        .expect("salary");

    let budget = engine
        .create_budget(
            "Household",
            3000.0,
            year_2024(),
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::FiftyThirtyTwenty),
        )
        .expect("create budget");
    engine
        .assign_category(budget, groceries, 0)
        .expect("assign groceries to needs");
    let err = engine
        .assign_category(budget, salary, 0)
        .expect_err("income cannot be budgeted");
    assert_eq!(err.kind(), ErrorKind::Validation);

    engine
        .record_transaction(Transaction::completed_expense(120.0, groceries, at(2024, 2, 3)))
        .expect("february groceries");
    engine
        .record_transaction(Transaction::completed_expense(180.0, groceries, at(2024, 3, 2)))
        .expect("march groceries");
    engine
        .record_transaction(Transaction::completed_expense(999.0, groceries, at(2024, 3, 20)))
        .expect("future groceries");

    let activation = engine
        .activate_budget(budget, ActivationConfirmation::NotConfirmed)
        .expect("activate");
    assert_eq!(activation.activated, budget);
    assert_eq!(
        engine.active_budget().expect("read").map(|b| b.id),
        Some(budget)
    );

    let compliance = engine
        .evaluate_category(budget, groceries)
        .expect("evaluate");
    assert_eq!(compliance.budget_limit, 1500.0);
    assert_eq!(compliance.current_spending, 300.0);
    assert_eq!(compliance.spending_percentage, 20.0);
    assert!(compliance.within_budget);

    let groups = engine.evaluate_budget(budget).expect("evaluate budget");
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].name, "Needs");
    assert_eq!(groups[0].result.current_spending, 300.0);
    assert_eq!(groups[1].result.current_spending, 0.0);
}

#[test]
fn replacing_the_active_budget_needs_confirmation() {
    let (mut engine, _, _) = setup_test_env(at(2024, 5, 1));
    let first = engine
        .create_budget(
            "First",
            2000.0,
            year_2024(),
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::EightyTwenty),
        )
        .expect("first");
    let second = engine
        .create_budget(
            "Second",
            2500.0,
            year_2024(),
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::SeventyTwentyTen),
        )
        .expect("second");

    engine
        .activate_budget(first, ActivationConfirmation::NotConfirmed)
        .expect("activate first");
    let err = engine
        .activate_budget(second, ActivationConfirmation::NotConfirmed)
        .expect_err("confirmation required");
    assert!(matches!(
        err,
        EngineError::Core(CoreError::ActivationRequiresConfirmation { .. })
    ));
    let stored = engine.store().budget(second).expect("read").expect("second");
    assert_eq!(stored.status, BudgetStatus::Draft);

    let activation = engine
        .activate_budget(second, ActivationConfirmation::ReplaceActive)
        .expect("replace");
    assert_eq!(activation.replaced, vec![first]);

    let replaced = engine.store().budget(first).expect("read").expect("first");
    assert_eq!(replaced.status, BudgetStatus::Expired);
    assert_eq!(replaced.replaced_by, Some(second));
    let active: Vec<_> = engine
        .store()
        .budgets()
        .expect("budgets")
        .into_iter()
        .filter(|b| b.status == BudgetStatus::Active)
        .map(|b| b.id)
        .collect();
    assert_eq!(active, vec![second]);
}

#[test]
fn elapsed_budgets_expire_when_persisted() {
    let (mut engine, _, dir) = setup_test_env(at(2024, 3, 1));
    let budget = engine
        .create_budget(
            "Q1",
            1000.0,
            DateRange::new(at(2024, 1, 1), at(2024, 4, 1)).expect("range"),
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::FiftyThirtyTwenty),
        )
        .expect("budget");
    engine
        .activate_budget(budget, ActivationConfirmation::NotConfirmed)
        .expect("activate");
    assert!(engine.expire_budgets().expect("nothing elapsed").is_empty());

    let store = JsonLedgerStore::new(dir).expect("reopen store");
    let mut later = InsightEngine::with_clock(
        Box::new(store),
        InsightSettings::default(),
        Arc::new(FixedClock(at(2024, 5, 1))),
    );
    assert!(later.active_budget().expect("read").is_none());
    assert_eq!(later.expire_budgets().expect("expire"), vec![budget]);
    let stored = later.store().budget(budget).expect("read").expect("budget");
    assert_eq!(stored.status, BudgetStatus::Expired);

    later.delete_budget(budget).expect("delete");
    let err = later.delete_budget(budget).expect_err("already gone");
    assert!(err.is_not_found());
}

#[test]
fn removing_a_category_moves_its_transactions_to_uncategorized() {
    let (mut engine, _, _) = setup_test_env(at(2024, 6, 30));
    let food = engine
        .add_category(Category::new("Food", CategoryKind::Expense))
        .expect("food");
    let dining = engine
        .add_category(Category::new("Dining", CategoryKind::Expense).with_parent(food))
        .expect("dining");
    let lunch = engine
        .record_transaction(Transaction::completed_expense(14.0, food, at(2024, 6, 4)))
        .expect("lunch");

    let reassigned = engine.remove_category(food).expect("remove");
    assert_eq!(reassigned, vec![lunch]);

    let sentinel = Category::uncategorized_id(CategoryKind::Expense);
    let moved = engine.store().transaction(lunch).expect("read").expect("lunch");
    assert_eq!(moved.category_id, sentinel);
    assert!(engine.store().category(sentinel).expect("read").is_some());
    let child = engine.store().category(dining).expect("read").expect("dining");
    assert_eq!(child.parent_id, None);
    assert!(engine.store().category(food).expect("read").is_none());

    let err = engine
        .remove_category(sentinel)
        .expect_err("sentinel stays");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn transactions_are_validated_and_soft_deleted() {
    let (mut engine, _, _) = setup_test_env(at(2024, 6, 30));
    let rent = engine
        .add_category(Category::new("Rent", CategoryKind::Expense))
        .expect("rent");

    let wrong_kind = Transaction::completed_income(10.0, rent, at(2024, 6, 1));
    let err = engine
        .record_transaction(wrong_kind)
        .expect_err("kind mismatch");
    assert!(matches!(
        err,
        EngineError::Core(CoreError::CategoryKindMismatch { .. })
    ));

    let pending = Transaction::new(CategoryKind::Expense, 1200.0, rent, at(2024, 6, 1));
    let id = engine.record_transaction(pending).expect("pending rent");
    engine
        .set_transaction_status(id, TransactionStatus::Completed)
        .expect("complete");
    let err = engine
        .set_transaction_status(id, TransactionStatus::Pending)
        .expect_err("completed is terminal");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let before = engine.update_insights().expect("before delete");
    assert_eq!(before.monthly_spending_by_category[&rent], 1200.0);

    assert!(engine.delete_transaction(id).expect("delete"));
    assert!(!engine.delete_transaction(id).expect("delete twice"));
    let after = engine.update_insights().expect("after delete");
    assert!(after.monthly_spending_by_category.get(&rent).is_none());
    assert_eq!(engine.insights().expect("read"), Some(after));
}

#[test]
fn recurring_transactions_expand_once() {
    let (mut engine, _, _) = setup_test_env(at(2024, 4, 1));
    let gym = engine
        .add_category(Category::new("Gym", CategoryKind::Expense))
        .expect("gym");
    let parent = Transaction::completed_expense(40.0, gym, at(2024, 1, 5))
        .with_recurrence(Recurrence::new(TimeInterval::monthly()));
    let parent_id = engine.record_transaction(parent).expect("parent");

    assert_eq!(engine.expand_recurrences(at(2024, 4, 1)).expect("expand"), 2);
    assert_eq!(engine.expand_recurrences(at(2024, 4, 1)).expect("again"), 0);

    let occurrences: Vec<_> = engine
        .store()
        .transactions()
        .expect("transactions")
        .into_iter()
        .filter(|t| t.recurrence_parent == Some(parent_id))
        .collect();
    assert_eq!(occurrences.len(), 2);
    assert!(occurrences
        .iter()
        .all(|t| t.status == TransactionStatus::Pending && t.amount == 40.0));
}

#[test]
fn goal_contributions_are_clamped_and_persisted() {
    let (mut engine, _, _) = setup_test_env(at(2024, 6, 1));
    let savings = engine
        .add_category(Category::new("Savings", CategoryKind::Expense))
        .expect("savings");

    let orphan = SavingsGoal::new("Orphan", 100.0, at(2025, 1, 1), uuid::Uuid::new_v4());
    assert!(engine.add_goal(orphan).expect_err("unknown category").is_not_found());

    let goal = engine
        .add_goal(SavingsGoal::new("Bike", 500.0, at(2025, 1, 1), savings))
        .expect("goal");
    assert_eq!(engine.contribute(goal, 300.0).expect("first"), 300.0);
    assert_eq!(engine.contribute(goal, 300.0).expect("second"), 200.0);
    let stored = engine.store().goal(goal).expect("read").expect("goal");
    assert_eq!(stored.current_amount, 500.0);

    let snapshot = engine.update_insights().expect("insights");
    assert_eq!(snapshot.savings_progress[&goal], 100.0);
}

#[test]
fn top_categories_use_configured_limit() {
    let (mut engine, _, _) = setup_test_env(at(2024, 7, 1));
    let mut ids = Vec::new();
    for (idx, name) in ["Rent", "Food", "Fuel", "Books", "Games", "Music"]
        .into_iter()
        .enumerate()
    {
        let id = engine
            .add_category(Category::new(name, CategoryKind::Expense))
            .expect("category");
        engine
            .record_transaction(Transaction::completed_expense(
                100.0 * (idx as f64 + 1.0),
                id,
                at(2024, 6, 10),
            ))
            .expect("txn");
        ids.push(id);
    }
    let june = DateRange::new(at(2024, 6, 1), at(2024, 7, 1)).expect("june");

    let top = engine.top_expense_categories(&june, None).expect("top");
    assert_eq!(top.len(), 5);
    assert_eq!(top[0].name, "Music");
    assert_eq!(top[0].amount, 600.0);

    let two = engine.top_expense_categories(&june, Some(2)).expect("top two");
    assert_eq!(
        two.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Music", "Games"]
    );

    let totals = engine.monthly_totals().expect("totals");
    assert_eq!(totals.values().copied().sum::<f64>(), 2100.0);
}
