//! Savings goals and their optional automatic contribution rules.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::TimeInterval;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for GoalPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GoalPriority::Low => "Low",
            GoalPriority::Medium => "Medium",
            GoalPriority::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoContribution {
    pub amount: f64,
    pub interval: TimeInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: Uuid,
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(with = "crate::timestamp::flexible")]
    pub deadline: DateTime<Utc>,
    pub category_id: Uuid,
    #[serde(default)]
    pub priority: GoalPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_contribution: Option<AutoContribution>,
}

impl SavingsGoal {
    pub fn new(
        name: impl Into<String>,
        target_amount: f64,
        deadline: DateTime<Utc>,
        category_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_amount,
            current_amount: 0.0,
            deadline,
            category_id,
            priority: GoalPriority::default(),
            auto_contribution: None,
        }
    }

    pub fn with_auto_contribution(mut self, amount: f64, interval: TimeInterval) -> Self {
        self.auto_contribution = Some(AutoContribution { amount, interval });
        self
    }

    /// Fraction of the target reached, always within `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.target_amount <= 0.0 || !self.target_amount.is_finite() {
            return 0.0;
        }
        (self.current_amount / self.target_amount).clamp(0.0, 1.0)
    }

    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    pub fn is_complete(&self) -> bool {
        self.target_amount > 0.0 && self.current_amount >= self.target_amount
    }

    /// Adds `amount`, clamping the stored balance to the target. Returns the amount applied.
    pub fn contribute(&mut self, amount: f64) -> f64 {
        let before = self.current_amount;
        self.current_amount = (self.current_amount + amount).clamp(0.0, self.target_amount.max(0.0));
        self.current_amount - before
    }
}
