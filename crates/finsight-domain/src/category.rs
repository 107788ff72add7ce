//! Domain types representing spending and income categories.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;


/// Sentinel that absorbs expense transactions whose category was removed.
pub const UNCATEGORIZED_EXPENSE_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
/// Sentinel that absorbs income transactions whose category was removed.
pub const UNCATEGORIZED_INCOME_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0002);
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// Categorises ledger activity for budgeting and reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

impl Category {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            parent_id: None,
            monthly_limit: None,
            color: None,
            icon: None,
            is_custom: true,
        }
    }

    /// Builds the sentinel category for the given kind.
    pub fn uncategorized(kind: CategoryKind) -> Self {
        Self {
            id: Self::uncategorized_id(kind),
            name: UNCATEGORIZED_NAME.into(),
            kind,
            parent_id: None,
            monthly_limit: None,
            color: None,
            icon: None,
            is_custom: false,
        }
    }

    pub fn uncategorized_id(kind: CategoryKind) -> Uuid {
        match kind {
            CategoryKind::Expense => UNCATEGORIZED_EXPENSE_ID,
            CategoryKind::Income => UNCATEGORIZED_INCOME_ID,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == UNCATEGORIZED_EXPENSE_ID || self.id == UNCATEGORIZED_INCOME_ID
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_monthly_limit(mut self, limit: f64) -> Self {
        self.monthly_limit = Some(limit);
        self
    }
}

/// Supported category types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CategoryKind::Expense => "Expense",
            CategoryKind::Income => "Income",
        };
        f.write_str(label)
    }
}
