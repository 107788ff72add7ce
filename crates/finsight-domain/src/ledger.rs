//! In-memory snapshot of every collection the engine reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    budget::Budget, category::Category, goal::SavingsGoal, insight::InsightSnapshot,
    transaction::Transaction,
};

/// A consistent copy of the ledger taken at the start of a computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<SavingsGoal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<InsightSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, category: Category) -> Uuid {
        let id = category.id;
        self.categories.push(category);
        id
    }

    pub fn add_transaction(&mut self, transaction: Transaction) -> Uuid {
        let id = transaction.id;
        self.transactions.push(transaction);
        id
    }

    pub fn add_budget(&mut self, budget: Budget) -> Uuid {
        let id = budget.id;
        self.budgets.push(budget);
        id
    }

    pub fn add_goal(&mut self, goal: SavingsGoal) -> Uuid {
        let id = goal.id;
        self.goals.push(goal);
        id
    }

    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn budget(&self, id: Uuid) -> Option<&Budget> {
        self.budgets.iter().find(|budget| budget.id == id)
    }

    pub fn goal(&self, id: Uuid) -> Option<&SavingsGoal> {
        self.goals.iter().find(|goal| goal.id == id)
    }

    /// Id-keyed category lookup for loops that resolve many references.
    pub fn category_index(&self) -> HashMap<Uuid, &Category> {
        self.categories
            .iter()
            .map(|category| (category.id, category))
            .collect()
    }
}
