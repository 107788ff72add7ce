//! The ledger store collaborator contract and an in-memory implementation.

use uuid::Uuid;

use finsight_domain::{Budget, Category, InsightSnapshot, Ledger, SavingsGoal, Transaction};

use crate::CoreError;

/// Keyed collections the engine reads from and writes derived values back to.
///
/// Implementations own their consistency model. The engine only ever calls
/// [`LedgerStore::snapshot`] once per computation and works on that copy.
pub trait LedgerStore: Send + Sync {
    fn categories(&self) -> Result<Vec<Category>, CoreError>;
    fn transactions(&self) -> Result<Vec<Transaction>, CoreError>;
    fn budgets(&self) -> Result<Vec<Budget>, CoreError>;
    fn goals(&self) -> Result<Vec<SavingsGoal>, CoreError>;
    fn insights(&self) -> Result<Option<InsightSnapshot>, CoreError>;

    fn upsert_category(&mut self, category: Category) -> Result<(), CoreError>;
    fn remove_category(&mut self, id: Uuid) -> Result<(), CoreError>;
    fn upsert_transaction(&mut self, transaction: Transaction) -> Result<(), CoreError>;
    fn upsert_budget(&mut self, budget: Budget) -> Result<(), CoreError>;
    /// Writes several transactions as one unit: either all land or none do.
    fn upsert_transactions(&mut self, transactions: Vec<Transaction>) -> Result<(), CoreError>;
    /// Writes several budgets as one unit: either all land or none do.
    fn upsert_budgets(&mut self, budgets: Vec<Budget>) -> Result<(), CoreError>;
    fn remove_budget(&mut self, id: Uuid) -> Result<(), CoreError>;
    fn upsert_goal(&mut self, goal: SavingsGoal) -> Result<(), CoreError>;
    /// Replaces the singleton insight record.
    fn put_insights(&mut self, snapshot: InsightSnapshot) -> Result<(), CoreError>;

    fn category(&self, id: Uuid) -> Result<Option<Category>, CoreError> {
        Ok(self.categories()?.into_iter().find(|c| c.id == id))
    }

    fn transaction(&self, id: Uuid) -> Result<Option<Transaction>, CoreError> {
        Ok(self.transactions()?.into_iter().find(|t| t.id == id))
    }

    fn budget(&self, id: Uuid) -> Result<Option<Budget>, CoreError> {
        Ok(self.budgets()?.into_iter().find(|b| b.id == id))
    }

    fn goal(&self, id: Uuid) -> Result<Option<SavingsGoal>, CoreError> {
        Ok(self.goals()?.into_iter().find(|g| g.id == id))
    }

    /// Copies every collection into one consistent value.
    fn snapshot(&self) -> Result<Ledger, CoreError> {
        Ok(Ledger {
            categories: self.categories()?,
            transactions: self.transactions()?,
            budgets: self.budgets()?,
            goals: self.goals()?,
            insights: self.insights()?,
        })
    }
}

/// Volatile store used by tests and hosts that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    ledger: Ledger,
    version: u64,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self { ledger, version: 0 }
    }

    /// Bumped on every write; lets callers detect a stale snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

fn upsert_by_id<T>(items: &mut Vec<T>, item: T, id_of: impl Fn(&T) -> Uuid) {
    let id = id_of(&item);
    match items.iter_mut().find(|existing| id_of(existing) == id) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn categories(&self) -> Result<Vec<Category>, CoreError> {
        Ok(self.ledger.categories.clone())
    }

    fn transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        Ok(self.ledger.transactions.clone())
    }

    fn budgets(&self) -> Result<Vec<Budget>, CoreError> {
        Ok(self.ledger.budgets.clone())
    }

    fn goals(&self) -> Result<Vec<SavingsGoal>, CoreError> {
        Ok(self.ledger.goals.clone())
    }

    fn insights(&self) -> Result<Option<InsightSnapshot>, CoreError> {
        Ok(self.ledger.insights.clone())
    }

    fn upsert_category(&mut self, category: Category) -> Result<(), CoreError> {
        upsert_by_id(&mut self.ledger.categories, category, |c| c.id);
        self.touch();
        Ok(())
    }

    fn remove_category(&mut self, id: Uuid) -> Result<(), CoreError> {
        let before = self.ledger.categories.len();
        self.ledger.categories.retain(|c| c.id != id);
        if self.ledger.categories.len() == before {
            return Err(CoreError::CategoryNotFound(id));
        }
        self.touch();
        Ok(())
    }

    fn upsert_transaction(&mut self, transaction: Transaction) -> Result<(), CoreError> {
        upsert_by_id(&mut self.ledger.transactions, transaction, |t| t.id);
        self.touch();
        Ok(())
    }

    fn upsert_budget(&mut self, budget: Budget) -> Result<(), CoreError> {
        upsert_by_id(&mut self.ledger.budgets, budget, |b| b.id);
        self.touch();
        Ok(())
    }

    fn upsert_transactions(&mut self, transactions: Vec<Transaction>) -> Result<(), CoreError> {
        if transactions.is_empty() {
            return Ok(());
        }
        for transaction in transactions {
            upsert_by_id(&mut self.ledger.transactions, transaction, |t| t.id);
        }
        self.touch();
        Ok(())
    }

    fn upsert_budgets(&mut self, budgets: Vec<Budget>) -> Result<(), CoreError> {
        if budgets.is_empty() {
            return Ok(());
        }
        for budget in budgets {
            upsert_by_id(&mut self.ledger.budgets, budget, |b| b.id);
        }
        self.touch();
        Ok(())
    }

    fn remove_budget(&mut self, id: Uuid) -> Result<(), CoreError> {
        let before = self.ledger.budgets.len();
        self.ledger.budgets.retain(|b| b.id != id);
        if self.ledger.budgets.len() == before {
            return Err(CoreError::BudgetNotFound(id));
        }
        self.touch();
        Ok(())
    }

    fn upsert_goal(&mut self, goal: SavingsGoal) -> Result<(), CoreError> {
        upsert_by_id(&mut self.ledger.goals, goal, |g| g.id);
        self.touch();
        Ok(())
    }

    fn put_insights(&mut self, snapshot: InsightSnapshot) -> Result<(), CoreError> {
        self.ledger.insights = Some(snapshot);
        self.touch();
        Ok(())
    }
}
