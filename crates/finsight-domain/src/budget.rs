//! Rule-based budgets and the allocation groups they split into.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::DateRange;

/// Cadence a budget is planned around.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriodType {
    Week,
    #[default]
    Month,
    Year,
}

impl fmt::Display for BudgetPeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetPeriodType::Week => "Weekly",
            BudgetPeriodType::Month => "Monthly",
            BudgetPeriodType::Year => "Yearly",
        };
        f.write_str(label)
    }
}

/// How spending in a group relates to the user's commitments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Essential,
    #[default]
    Discretionary,
    Savings,
}

/// Named allocation rules with constant percentage splits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FixedRule {
    #[serde(rename = "50/30/20")]
    FiftyThirtyTwenty,
    #[serde(rename = "70/20/10")]
    SeventyTwentyTen,
    #[serde(rename = "15/65/20")]
    FifteenSixtyFiveTwenty,
    #[serde(rename = "80/20")]
    EightyTwenty,
}

impl FixedRule {
    pub const ALL: [FixedRule; 4] = [
        FixedRule::FiftyThirtyTwenty,
        FixedRule::SeventyTwentyTen,
        FixedRule::FifteenSixtyFiveTwenty,
        FixedRule::EightyTwenty,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FixedRule::FiftyThirtyTwenty => "50/30/20",
            FixedRule::SeventyTwentyTen => "70/20/10",
            FixedRule::FifteenSixtyFiveTwenty => "15/65/20",
            FixedRule::EightyTwenty => "80/20",
        }
    }

    /// The rule's groups in display order.
    pub fn templates(self) -> Vec<GroupTemplate> {
        let split: &[(&str, f64, GroupRole)] = match self {
            FixedRule::FiftyThirtyTwenty => &[
                ("Needs", 50.0, GroupRole::Essential),
                ("Wants", 30.0, GroupRole::Discretionary),
                ("Savings", 20.0, GroupRole::Savings),
            ],
            FixedRule::SeventyTwentyTen => &[
                ("Living Expenses", 70.0, GroupRole::Essential),
                ("Savings", 20.0, GroupRole::Savings),
                ("Debt & Giving", 10.0, GroupRole::Discretionary),
            ],
            FixedRule::FifteenSixtyFiveTwenty => &[
                ("Savings", 15.0, GroupRole::Savings),
                ("Essentials", 65.0, GroupRole::Essential),
                ("Lifestyle", 20.0, GroupRole::Discretionary),
            ],
            FixedRule::EightyTwenty => &[
                ("Spending", 80.0, GroupRole::Essential),
                ("Savings", 20.0, GroupRole::Savings),
            ],
        };
        split
            .iter()
            .map(|(name, percentage, role)| GroupTemplate {
                name: (*name).to_string(),
                percentage: *percentage,
                role: *role,
            })
            .collect()
    }
}

impl fmt::Display for FixedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A group definition before any categories are assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupTemplate {
    pub name: String,
    pub percentage: f64,
    #[serde(default)]
    pub role: GroupRole,
}

impl GroupTemplate {
    pub fn new(name: impl Into<String>, percentage: f64, role: GroupRole) -> Self {
        Self {
            name: name.into(),
            percentage,
            role,
        }
    }
}

/// Either a named rule or a user-defined split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetRule {
    Fixed { rule: FixedRule },
    Custom { groups: Vec<GroupTemplate> },
}

impl BudgetRule {
    pub fn fixed(rule: FixedRule) -> Self {
        BudgetRule::Fixed { rule }
    }

    pub fn custom(groups: Vec<GroupTemplate>) -> Self {
        BudgetRule::Custom { groups }
    }
}

/// A named percentage slice of a budget owning a set of categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationGroup {
    pub name: String,
    pub percentage: f64,
    #[serde(default)]
    pub role: GroupRole,
    #[serde(default)]
    pub categories: BTreeSet<Uuid>,
}

impl AllocationGroup {
    pub fn from_template(template: &GroupTemplate) -> Self {
        Self {
            name: template.name.clone(),
            percentage: template.percentage,
            role: template.role,
            categories: BTreeSet::new(),
        }
    }

    /// Share of `total` owned by this group.
    pub fn limit(&self, total: f64) -> f64 {
        (self.percentage / 100.0) * total
    }

    pub fn contains(&self, category_id: Uuid) -> bool {
        self.categories.contains(&category_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Lifecycle state of a budget.
pub enum BudgetStatus {
    Draft,
    Active,
    Expired,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetStatus::Draft => "Draft",
            BudgetStatus::Active => "Active",
            BudgetStatus::Expired => "Expired",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    #[serde(with = "crate::timestamp::flexible")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "crate::timestamp::flexible")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub period_type: BudgetPeriodType,
    pub rule: BudgetRule,
    #[serde(default)]
    pub category_allocations: Vec<AllocationGroup>,
    pub status: BudgetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<Uuid>,
}

impl Budget {
    /// Status after applying lazy expiry at `now`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> BudgetStatus {
        if self.status != BudgetStatus::Expired && now >= self.end_date {
            BudgetStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == BudgetStatus::Active
    }

    /// The budget's lifetime as a half-open range.
    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.start_date,
            to: self.end_date,
        }
    }

    /// Index and group owning `category_id`, if any.
    pub fn group_of(&self, category_id: Uuid) -> Option<(usize, &AllocationGroup)> {
        self.category_allocations
            .iter()
            .enumerate()
            .find(|(_, group)| group.contains(category_id))
    }
}
