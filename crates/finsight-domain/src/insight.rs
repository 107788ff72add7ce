//! Derived, read-only projections: compliance results, trends, and the insight snapshot.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::MonthKey;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        };
        f.write_str(label)
    }
}

/// Mean of a series together with its thresholded direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CategoryTrend {
    pub average: f64,
    pub trend: TrendDirection,
}

/// Spending compared against an allocated limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub within_budget: bool,
    pub current_spending: f64,
    pub budget_limit: f64,
    pub remaining_budget: f64,
    pub spending_percentage: f64,
}

impl ComplianceResult {
    pub fn from_parts(current_spending: f64, budget_limit: f64) -> Self {
        let spending_percentage = if budget_limit > 0.0 {
            current_spending / budget_limit * 100.0
        } else {
            0.0
        };
        Self {
            within_budget: current_spending <= budget_limit,
            current_spending,
            budget_limit,
            remaining_budget: budget_limit - current_spending,
            spending_percentage,
        }
    }
}

/// Compliance for one allocation group and each of its categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupCompliance {
    pub name: String,
    pub percentage: f64,
    pub result: ComplianceResult,
    pub categories: BTreeMap<Uuid, ComplianceResult>,
}

/// A category ranked by expense amount within a range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankedCategory {
    pub name: String,
    /// Earliest id among the categories sharing `name`.
    pub category_id: Uuid,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnusualSpending {
    pub category_id: Uuid,
    pub amount: f64,
    pub percentage_increase: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingTrends {
    pub monthly: BTreeMap<MonthKey, f64>,
    pub category_trends: BTreeMap<Uuid, CategoryTrend>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Transaction,
    Budget,
    Goal,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Category => "category",
            EntityKind::Transaction => "transaction",
            EntityKind::Budget => "budget",
            EntityKind::Goal => "goal",
        };
        f.write_str(label)
    }
}

/// An entity left out of a snapshot rebuild and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedEntity {
    pub entity: EntityKind,
    pub id: Uuid,
    pub reason: String,
}

/// Fully recomputed summary consumed by UI collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightSnapshot {
    pub guilt_free_balance: f64,
    pub projected_savings: f64,
    pub monthly_spending_by_category: BTreeMap<Uuid, f64>,
    pub savings_progress: BTreeMap<Uuid, f64>,
    pub unusual_spending: Vec<UnusualSpending>,
    pub trends: SpendingTrends,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntity>,
    #[serde(with = "crate::timestamp::flexible")]
    pub last_updated: DateTime<Utc>,
}

impl InsightSnapshot {
    /// Compares every derived field, ignoring `last_updated`.
    pub fn same_content(&self, other: &InsightSnapshot) -> bool {
        self.guilt_free_balance.to_bits() == other.guilt_free_balance.to_bits()
            && self.projected_savings.to_bits() == other.projected_savings.to_bits()
            && self.monthly_spending_by_category == other.monthly_spending_by_category
            && self.savings_progress == other.savings_progress
            && self.unusual_spending == other.unusual_spending
            && self.trends == other.trends
            && self.skipped == other.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_reports_zero_percentage() {
        let result = ComplianceResult::from_parts(0.0, 0.0);
        assert!(result.within_budget);
        assert_eq!(result.spending_percentage, 0.0);

        let overspent = ComplianceResult::from_parts(12.0, 0.0);
        assert!(!overspent.within_budget);
        assert_eq!(overspent.spending_percentage, 0.0);
    }

    #[test]
    fn month_keys_serialize_as_map_keys() {
        let mut trends = SpendingTrends::default();
        trends
            .monthly
            .insert("2023-02".parse().unwrap(), 1100.0);
        let json = serde_json::to_string(&trends).unwrap();
        assert!(json.contains(r#""2023-02":1100.0"#), "{json}");
    }
}
