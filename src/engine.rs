use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use finsight_config::{Config, InsightSettings};
use finsight_core::{
    Activation, ActivationConfirmation, BudgetService, CategoryCatalog, Clock,
    ComplianceEvaluator, CoreError, GoalService, InsightService, LedgerStore, SpendFilter,
    SystemClock, TransactionService, TrendAnalyzer,
};
use finsight_domain::{
    Budget, BudgetPeriodType, BudgetRule, Category, CategoryKind, ComplianceResult, DateRange,
    GroupCompliance, InsightSnapshot, MonthKey, RankedCategory, SavingsGoal, Transaction,
    TransactionStatus,
};
use finsight_storage_json::JsonLedgerStore;

use crate::errors::EngineError;

/// Facade that wires a ledger store, the insight settings and a clock together.
///
/// Every mutation goes through the matching core service first and is only
/// written back once it validated.
pub struct InsightEngine {
    store: Box<dyn LedgerStore>,
    settings: InsightSettings,
    clock: Arc<dyn Clock>,
}

impl InsightEngine {
    pub fn new(store: Box<dyn LedgerStore>, settings: InsightSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Box<dyn LedgerStore>,
        settings: InsightSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            settings,
            clock,
        }
    }

    /// Opens the JSON ledger under the configured data directory.
    pub fn open(config: &Config) -> Result<Self, EngineError> {
        config.validate()?;
        let root = config.resolve_data_dir();
        debug!(path = %root.display(), "opening ledger store");
        let store = JsonLedgerStore::new(root)?;
        Ok(Self::new(Box::new(store), config.insights.clone()))
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &InsightSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: InsightSettings) -> Result<(), EngineError> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Strict view of the stored categories; a broken tree is an error here.
    pub fn catalog(&self) -> Result<CategoryCatalog, EngineError> {
        Ok(CategoryCatalog::from_categories(self.store.categories()?)?)
    }

    pub fn add_category(&mut self, category: Category) -> Result<Uuid, EngineError> {
        let mut catalog = self.catalog()?;
        let id = catalog.insert(category)?;
        let stored = catalog.require(id)?.clone();
        self.store.upsert_category(stored)?;
        Ok(id)
    }

    /// Removes a category and persists everything that moved with it: referencing
    /// transactions go to the matching "Uncategorized" category, children to the
    /// removed category's parent. Returns the reassigned transaction ids.
    pub fn remove_category(&mut self, id: Uuid) -> Result<Vec<Uuid>, EngineError> {
        let mut catalog = self.catalog()?;
        let sentinel = Category::uncategorized_id(catalog.require(id)?.kind);
        let children: Vec<Uuid> = catalog.children(id).iter().map(|c| c.id).collect();
        let mut transactions = self.store.transactions()?;
        let reassigned = catalog.remove(id, &mut transactions)?;

        if !reassigned.is_empty() && self.store.category(sentinel)?.is_none() {
            self.store
                .upsert_category(catalog.require(sentinel)?.clone())?;
        }
        self.store.upsert_transactions(
            transactions
                .into_iter()
                .filter(|txn| reassigned.contains(&txn.id))
                .collect(),
        )?;
        for child in children {
            self.store
                .upsert_category(catalog.require(child)?.clone())?;
        }
        self.store.remove_category(id)?;
        Ok(reassigned)
    }

    pub fn record_transaction(&mut self, transaction: Transaction) -> Result<Uuid, EngineError> {
        let catalog = self.catalog()?;
        TransactionService::validate(&catalog, &transaction)?;
        let id = transaction.id;
        self.store.upsert_transaction(transaction)?;
        Ok(id)
    }

    pub fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), EngineError> {
        let mut txn = self.require_transaction(id)?;
        TransactionService::transition(&mut txn, status)?;
        self.store.upsert_transaction(txn)?;
        Ok(())
    }

    /// Soft-deletes a transaction. Returns `false` when it was already deleted.
    pub fn delete_transaction(&mut self, id: Uuid) -> Result<bool, EngineError> {
        let mut txn = self.require_transaction(id)?;
        if !TransactionService::soft_delete(&mut txn, self.now()) {
            return Ok(false);
        }
        self.store.upsert_transaction(txn)?;
        Ok(true)
    }

    /// Materializes recurring occurrences due before `until`.
    pub fn expand_recurrences(&mut self, until: DateTime<Utc>) -> Result<usize, EngineError> {
        let existing = self.store.transactions()?;
        let occurrences: Vec<Transaction> = existing
            .iter()
            .filter(|txn| txn.recurrence.is_some())
            .flat_map(|parent| TransactionService::expand_recurrence(parent, &existing, until))
            .collect();
        let generated = occurrences.len();
        self.store.upsert_transactions(occurrences)?;
        debug!(generated, "recurrences expanded");
        Ok(generated)
    }

    pub fn create_budget(
        &mut self,
        name: &str,
        amount: f64,
        range: DateRange,
        period_type: BudgetPeriodType,
        rule: BudgetRule,
    ) -> Result<Uuid, EngineError> {
        let budget = BudgetService::create(name, amount, range, period_type, rule)?;
        let id = budget.id;
        self.store.upsert_budget(budget)?;
        Ok(id)
    }

    pub fn assign_category(
        &mut self,
        budget_id: Uuid,
        category_id: Uuid,
        group_index: usize,
    ) -> Result<(), EngineError> {
        let catalog = self.catalog()?;
        let mut budget = self.require_budget(budget_id)?;
        BudgetService::assign_category(&mut budget, &catalog, category_id, group_index)?;
        self.store.upsert_budget(budget)?;
        Ok(())
    }

    /// Activates a budget and persists every budget whose stored status changed
    /// in one write, so a failure never leaves two active budgets behind.
    pub fn activate_budget(
        &mut self,
        id: Uuid,
        confirmation: ActivationConfirmation,
    ) -> Result<Activation, EngineError> {
        let mut budgets = self.store.budgets()?;
        let activation = BudgetService::activate(&mut budgets, id, confirmation, self.now())?;
        let changed = activation.changed();
        self.store.upsert_budgets(
            budgets
                .into_iter()
                .filter(|b| changed.contains(&b.id))
                .collect(),
        )?;
        Ok(activation)
    }

    pub fn active_budget(&self) -> Result<Option<Budget>, EngineError> {
        let budgets = self.store.budgets()?;
        Ok(BudgetService::active_budget(&budgets, self.now()).cloned())
    }

    /// Writes lazy expiry back to the store.
    pub fn expire_budgets(&mut self) -> Result<Vec<Uuid>, EngineError> {
        let mut budgets = self.store.budgets()?;
        let changed = BudgetService::expire_elapsed(&mut budgets, self.now());
        self.store.upsert_budgets(
            budgets
                .into_iter()
                .filter(|b| changed.contains(&b.id))
                .collect(),
        )?;
        Ok(changed)
    }

    pub fn delete_budget(&mut self, id: Uuid) -> Result<(), EngineError> {
        self.store.remove_budget(id)?;
        info!(budget = %id, "budget deleted");
        Ok(())
    }

    pub fn evaluate_category(
        &self,
        budget_id: Uuid,
        category_id: Uuid,
    ) -> Result<ComplianceResult, EngineError> {
        let budget = self.require_budget(budget_id)?;
        let transactions = self.store.transactions()?;
        Ok(ComplianceEvaluator::evaluate(
            category_id,
            &budget,
            &transactions,
            self.now(),
        ))
    }

    pub fn evaluate_budget(&self, budget_id: Uuid) -> Result<Vec<GroupCompliance>, EngineError> {
        let budget = self.require_budget(budget_id)?;
        let transactions = self.store.transactions()?;
        Ok(ComplianceEvaluator::evaluate_budget(
            &budget,
            &transactions,
            self.now(),
        ))
    }

    pub fn add_goal(&mut self, goal: SavingsGoal) -> Result<Uuid, EngineError> {
        GoalService::validate(&goal)?;
        if self.store.category(goal.category_id)?.is_none() {
            return Err(CoreError::CategoryNotFound(goal.category_id).into());
        }
        let id = goal.id;
        self.store.upsert_goal(goal)?;
        Ok(id)
    }

    /// Returns the amount actually applied after clamping to the target.
    pub fn contribute(&mut self, goal_id: Uuid, amount: f64) -> Result<f64, EngineError> {
        let mut goals = self.store.goals()?;
        let applied = GoalService::contribute(&mut goals, goal_id, amount)?;
        if let Some(goal) = goals.into_iter().find(|goal| goal.id == goal_id) {
            self.store.upsert_goal(goal)?;
        }
        Ok(applied)
    }

    /// Expense totals per month under the configured pending policy.
    pub fn monthly_totals(&self) -> Result<BTreeMap<MonthKey, f64>, EngineError> {
        let transactions = self.store.transactions()?;
        Ok(TrendAnalyzer::monthly_totals_with(
            &transactions,
            CategoryKind::Expense,
            self.spend_filter(),
        ))
    }

    /// Ranked expense categories in `range`; `limit` defaults to the configured one.
    pub fn top_expense_categories(
        &self,
        range: &DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<RankedCategory>, EngineError> {
        let (catalog, _) = CategoryCatalog::load_lenient(&self.store.categories()?);
        let transactions = self.store.transactions()?;
        let limit = limit.unwrap_or(self.settings.top_categories_limit);
        Ok(TrendAnalyzer::top_expense_categories(
            &transactions,
            &catalog,
            range,
            limit,
        )?)
    }

    /// Recomputes the insight snapshot and stores it.
    pub fn update_insights(&mut self) -> Result<InsightSnapshot, EngineError> {
        let snapshot =
            InsightService::update_insights(self.store.as_mut(), &self.settings, self.clock.as_ref())?;
        info!(
            skipped = snapshot.skipped.len(),
            flagged = snapshot.unusual_spending.len(),
            "insights updated"
        );
        Ok(snapshot)
    }

    pub fn insights(&self) -> Result<Option<InsightSnapshot>, EngineError> {
        Ok(self.store.insights()?)
    }

    fn spend_filter(&self) -> SpendFilter {
        SpendFilter {
            include_pending: self.settings.include_pending,
        }
    }

    fn require_transaction(&self, id: Uuid) -> Result<Transaction, EngineError> {
        self.store
            .transaction(id)?
            .ok_or_else(|| CoreError::TransactionNotFound(id).into())
    }

    fn require_budget(&self, id: Uuid) -> Result<Budget, EngineError> {
        self.store
            .budget(id)?
            .ok_or_else(|| CoreError::BudgetNotFound(id).into())
    }
}
