//! Savings goal progress, contributions, and automatic contribution schedules.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use finsight_domain::{DateRange, SavingsGoal};

use crate::CoreError;

pub struct GoalService;

impl GoalService {
    /// Progress as a percentage in `[0, 100]`. Goals without a positive target are invalid.
    pub fn progress(goal: &SavingsGoal) -> Result<f64, CoreError> {
        Self::validate(goal)?;
        Ok(goal.progress() * 100.0)
    }

    pub fn validate(goal: &SavingsGoal) -> Result<(), CoreError> {
        if !goal.target_amount.is_finite() || goal.target_amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "goal `{}` needs a positive target amount",
                goal.name
            )));
        }
        if !goal.current_amount.is_finite() {
            return Err(CoreError::Validation(format!(
                "goal `{}` has a non-finite balance",
                goal.name
            )));
        }
        Ok(())
    }

    /// Applies a contribution to the goal with the given id, clamped to the target.
    /// Returns the amount actually applied.
    pub fn contribute(goals: &mut [SavingsGoal], id: Uuid, amount: f64) -> Result<f64, CoreError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "contribution must be positive, got {}",
                amount
            )));
        }
        let goal = goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or(CoreError::GoalNotFound(id))?;
        Self::validate(goal)?;
        Ok(goal.contribute(amount))
    }

    /// Automatic contribution normalised to a 30-day month. Zero once the goal is reached.
    pub fn monthly_commitment(goal: &SavingsGoal) -> f64 {
        if goal.is_complete() {
            return 0.0;
        }
        goal.auto_contribution
            .as_ref()
            .filter(|rule| rule.amount.is_finite() && rule.amount > 0.0)
            .map(|rule| rule.amount * rule.interval.occurrences_per_month())
            .unwrap_or(0.0)
    }

    /// Scheduled auto-contribution instants inside `range`, counted from `anchor`
    /// and never past the goal deadline.
    pub fn auto_contributions_due(
        goal: &SavingsGoal,
        anchor: DateTime<Utc>,
        range: &DateRange,
    ) -> Vec<DateTime<Utc>> {
        let Some(rule) = goal.auto_contribution.as_ref() else {
            return Vec::new();
        };
        let mut due = Vec::new();
        for n in 0.. {
            let Some(at) = rule.interval.nth_timestamp(anchor, n) else {
                break;
            };
            if at >= range.to || at > goal.deadline {
                break;
            }
            if range.contains(at) {
                due.push(at);
            }
        }
        due
    }
}
