//! Validated category catalog with a cycle-free parent hierarchy.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use finsight_domain::{Category, CategoryKind, Transaction};

use crate::CoreError;

const DEFAULT_EXPENSES: [&str; 7] = [
    "Groceries",
    "Rent",
    "Utilities",
    "Transport",
    "Dining",
    "Entertainment",
    "Savings",
];
const DEFAULT_INCOME: [&str; 1] = ["Salary"];

/// Categories keyed by id. Always contains both "Uncategorized" sentinels.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: BTreeMap<Uuid, Category>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryCatalog {
    pub fn new() -> Self {
        let mut categories = BTreeMap::new();
        for kind in [CategoryKind::Expense, CategoryKind::Income] {
            let sentinel = Category::uncategorized(kind);
            categories.insert(sentinel.id, sentinel);
        }
        Self { categories }
    }

    /// Catalog seeded with the stock categories offered to new users.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let seeds = DEFAULT_INCOME
            .iter()
            .map(|name| (name, CategoryKind::Income))
            .chain(DEFAULT_EXPENSES.iter().map(|name| (name, CategoryKind::Expense)));
        for (name, kind) in seeds {
            let mut category = Category::new(*name, kind);
            category.is_custom = false;
            catalog.categories.insert(category.id, category);
        }
        catalog
    }

    /// Builds a catalog from stored categories, validating ids and the parent tree.
    pub fn from_categories(
        categories: impl IntoIterator<Item = Category>,
    ) -> Result<Self, CoreError> {
        let mut catalog = Self::new();
        for category in categories {
            if category.is_sentinel() {
                catalog.categories.insert(category.id, category);
                continue;
            }
            if catalog.categories.contains_key(&category.id) {
                return Err(CoreError::Validation(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
            Self::validate_fields(&category)?;
            catalog.categories.insert(category.id, category);
        }
        let linked: Vec<(Uuid, Uuid)> = catalog
            .categories
            .values()
            .filter_map(|c| c.parent_id.map(|parent| (c.id, parent)))
            .collect();
        for (id, parent) in linked {
            catalog.check_parent(id, parent)?;
        }
        Ok(catalog)
    }

    /// Best-effort variant of [`CategoryCatalog::from_categories`]: categories that fail
    /// validation are left out and returned with their error instead of aborting.
    pub fn load_lenient(categories: &[Category]) -> (Self, Vec<(Uuid, CoreError)>) {
        let mut catalog = Self::new();
        let mut rejected = Vec::new();
        let mut pending: Vec<&Category> = Vec::new();
        for category in categories {
            if category.is_sentinel() {
                catalog.categories.insert(category.id, category.clone());
            } else {
                pending.push(category);
            }
        }

        // Parents may appear after their children, so retry until nothing changes.
        loop {
            let before = pending.len();
            let mut deferred = Vec::new();
            for category in pending {
                let parent_missing = category
                    .parent_id
                    .map_or(false, |parent| !catalog.contains(parent));
                if parent_missing {
                    deferred.push(category);
                    continue;
                }
                if let Err(err) = catalog.insert(category.clone()) {
                    rejected.push((category.id, err));
                }
            }
            pending = deferred;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        let by_id: BTreeMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();
        for category in pending {
            rejected.push((category.id, Self::unresolved_parent(category, &by_id)));
        }
        (catalog, rejected)
    }

    fn unresolved_parent(category: &Category, by_id: &BTreeMap<Uuid, &Category>) -> CoreError {
        let parent = category.parent_id.unwrap_or(category.id);
        let mut cursor = Some(parent);
        for _ in 0..=by_id.len() {
            let Some(current) = cursor else { break };
            if current == category.id {
                return CoreError::CategoryCycle {
                    category: category.id,
                    parent,
                };
            }
            match by_id.get(&current) {
                Some(ancestor) => cursor = ancestor.parent_id,
                None => return CoreError::CategoryNotFound(current),
            }
        }
        CoreError::Validation(format!(
            "an ancestor of category `{}` could not be loaded",
            category.name
        ))
    }

    pub fn get(&self, id: Uuid) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn require(&self, id: Uuid) -> Result<&Category, CoreError> {
        self.get(id).ok_or(CoreError::CategoryNotFound(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.categories.contains_key(&id)
    }

    /// Categories in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn of_kind(&self, kind: CategoryKind) -> impl Iterator<Item = &Category> {
        self.categories.values().filter(move |c| c.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Category> {
        self.categories.values().cloned().collect()
    }

    /// Adds a new category. The parent, if any, must exist and share the kind.
    pub fn insert(&mut self, category: Category) -> Result<Uuid, CoreError> {
        if self.categories.contains_key(&category.id) {
            return Err(CoreError::Validation(format!(
                "category {} already exists",
                category.id
            )));
        }
        Self::validate_fields(&category)?;
        let id = category.id;
        let parent = category.parent_id;
        self.categories.insert(id, category);
        if let Some(parent) = parent {
            if let Err(err) = self.check_parent(id, parent) {
                self.categories.remove(&id);
                return Err(err);
            }
        }
        debug!(category = %id, "category added");
        Ok(id)
    }

    /// Re-parents a category, rejecting moves that would close a cycle.
    pub fn set_parent(&mut self, id: Uuid, parent: Option<Uuid>) -> Result<(), CoreError> {
        self.require(id)?;
        if let Some(parent) = parent {
            self.check_parent(id, parent)?;
        }
        if let Some(category) = self.categories.get_mut(&id) {
            category.parent_id = parent;
        }
        Ok(())
    }

    /// Ids from the direct parent up to the root.
    pub fn ancestors(&self, id: Uuid) -> Vec<Uuid> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id).and_then(|c| c.parent_id);
        while let Some(parent) = cursor {
            if chain.contains(&parent) || chain.len() > self.categories.len() {
                break;
            }
            chain.push(parent);
            cursor = self.get(parent).and_then(|c| c.parent_id);
        }
        chain
    }

    pub fn children(&self, id: Uuid) -> Vec<&Category> {
        self.categories
            .values()
            .filter(|c| c.parent_id == Some(id))
            .collect()
    }

    /// Removes a category, moving its transactions to the matching sentinel and
    /// its children up to its own parent. Returns the reassigned transaction ids.
    pub fn remove(
        &mut self,
        id: Uuid,
        transactions: &mut [Transaction],
    ) -> Result<Vec<Uuid>, CoreError> {
        let removed = self.require(id)?.clone();
        if removed.is_sentinel() {
            return Err(CoreError::Validation(
                "the Uncategorized category cannot be removed".into(),
            ));
        }
        let sentinel = Category::uncategorized_id(removed.kind);
        let mut reassigned = Vec::new();
        for txn in transactions.iter_mut().filter(|txn| txn.category_id == id) {
            txn.category_id = sentinel;
            reassigned.push(txn.id);
        }
        for child in self.categories.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = removed.parent_id;
            }
        }
        self.categories.remove(&id);
        debug!(category = %id, reassigned = reassigned.len(), "category removed");
        Ok(reassigned)
    }

    /// Checks that a transaction references an existing category of the same kind.
    pub fn validate_transaction(&self, txn: &Transaction) -> Result<(), CoreError> {
        let category = self.require(txn.category_id)?;
        if category.kind != txn.kind {
            return Err(CoreError::CategoryKindMismatch {
                category: category.id,
                expected: category.kind,
                actual: txn.kind,
            });
        }
        Ok(())
    }

    fn validate_fields(category: &Category) -> Result<(), CoreError> {
        if category.name.trim().is_empty() {
            return Err(CoreError::Validation("category name must not be empty".into()));
        }
        if let Some(limit) = category.monthly_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(CoreError::Validation(format!(
                    "monthly limit for `{}` must be a non-negative number",
                    category.name
                )));
            }
        }
        Ok(())
    }

    fn check_parent(&self, id: Uuid, parent: Uuid) -> Result<(), CoreError> {
        let parent_category = self.require(parent)?;
        let child = self.require(id)?;
        if parent_category.kind != child.kind {
            return Err(CoreError::Validation(format!(
                "parent `{}` is {} but `{}` is {}",
                parent_category.name, parent_category.kind, child.name, child.kind
            )));
        }
        let mut cursor = Some(parent);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == id {
                return Err(CoreError::CategoryCycle {
                    category: id,
                    parent,
                });
            }
            steps += 1;
            if steps > self.categories.len() {
                return Err(CoreError::CategoryCycle {
                    category: id,
                    parent,
                });
            }
            cursor = self.get(current).and_then(|c| c.parent_id);
        }
        Ok(())
    }
}
