//! Turns a budget rule into percentage groups and manages category membership.

use std::collections::BTreeSet;

use uuid::Uuid;

use finsight_domain::{AllocationGroup, BudgetRule, GroupTemplate};

use crate::CoreError;

/// Accumulated float error tolerated when checking that percentages total 100.
pub const PERCENT_TOLERANCE: f64 = 1e-6;

pub struct BudgetAllocator;

impl BudgetAllocator {
    /// Produces the allocation groups for `rule`, each with an empty category set.
    pub fn allocate(rule: &BudgetRule, total: f64) -> Result<Vec<AllocationGroup>, CoreError> {
        if !total.is_finite() || total < 0.0 {
            return Err(CoreError::InvalidAllocation(format!(
                "budget amount must be a non-negative number, got {}",
                total
            )));
        }
        let templates = match rule {
            BudgetRule::Fixed { rule } => rule.templates(),
            BudgetRule::Custom { groups } => {
                Self::validate_templates(groups)?;
                groups.clone()
            }
        };
        Ok(templates.iter().map(AllocationGroup::from_template).collect())
    }

    /// Moves `category_id` into the group at `group_index`, removing it from any other group.
    pub fn assign_category(
        groups: &mut [AllocationGroup],
        category_id: Uuid,
        group_index: usize,
    ) -> Result<(), CoreError> {
        if group_index >= groups.len() {
            return Err(CoreError::Validation(format!(
                "allocation group index {} out of range ({} groups)",
                group_index,
                groups.len()
            )));
        }
        for group in groups.iter_mut() {
            group.categories.remove(&category_id);
        }
        groups[group_index].categories.insert(category_id);
        Ok(())
    }

    /// Removes the category from whichever group holds it.
    pub fn unassign(groups: &mut [AllocationGroup], category_id: Uuid) -> bool {
        groups
            .iter_mut()
            .any(|group| group.categories.remove(&category_id))
    }

    /// Checks a finished allocation: percentages total 100 and no category is shared.
    pub fn validate_groups(groups: &[AllocationGroup]) -> Result<(), CoreError> {
        if groups.is_empty() {
            return Err(CoreError::InvalidAllocation(
                "at least one allocation group is required".into(),
            ));
        }
        let total: f64 = groups.iter().map(|g| g.percentage).sum();
        if (total - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(CoreError::InvalidAllocation(format!(
                "group percentages sum to {}, expected 100",
                total
            )));
        }
        let mut seen = BTreeSet::new();
        for group in groups {
            for category in &group.categories {
                if !seen.insert(*category) {
                    return Err(CoreError::InvalidAllocation(format!(
                        "category {} belongs to more than one group",
                        category
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_templates(groups: &[GroupTemplate]) -> Result<(), CoreError> {
        if groups.is_empty() {
            return Err(CoreError::InvalidAllocation(
                "custom rule requires at least one group".into(),
            ));
        }
        let mut names = BTreeSet::new();
        for group in groups {
            let name = group.name.trim();
            if name.is_empty() {
                return Err(CoreError::InvalidAllocation("group name must not be empty".into()));
            }
            if !names.insert(name.to_lowercase()) {
                return Err(CoreError::InvalidAllocation(format!(
                    "duplicate group name `{}`",
                    name
                )));
            }
            if !group.percentage.is_finite() || group.percentage < 0.0 {
                return Err(CoreError::InvalidAllocation(format!(
                    "group `{}` has invalid percentage {}",
                    name, group.percentage
                )));
            }
        }
        let total: f64 = groups.iter().map(|g| g.percentage).sum();
        if (total - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(CoreError::InvalidAllocation(format!(
                "custom percentages sum to {}, expected 100",
                total
            )));
        }
        Ok(())
    }
}
