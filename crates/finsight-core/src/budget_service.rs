//! Budget lifecycle: draft creation, confirmed activation, and lazy expiry.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use finsight_domain::{Budget, BudgetPeriodType, BudgetRule, BudgetStatus, CategoryKind, DateRange};

use crate::{BudgetAllocator, CategoryCatalog, CoreError};

/// Caller's answer to "replace the currently active budget?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationConfirmation {
    NotConfirmed,
    ReplaceActive,
}

/// Budgets whose stored status changed during an activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub activated: Uuid,
    /// Previously active budgets moved to expired-by-replacement.
    pub replaced: Vec<Uuid>,
    /// Budgets found past their end date and expired along the way.
    pub expired: Vec<Uuid>,
    pub already_active: bool,
}

impl Activation {
    pub fn changed(&self) -> Vec<Uuid> {
        if self.already_active {
            return self.expired.clone();
        }
        let mut ids = vec![self.activated];
        ids.extend(self.replaced.iter().copied());
        ids.extend(self.expired.iter().copied());
        ids
    }
}

pub struct BudgetService;

impl BudgetService {
    /// Builds a draft budget with the rule's groups and no category assignments.
    pub fn create(
        name: impl Into<String>,
        amount: f64,
        range: DateRange,
        period_type: BudgetPeriodType,
        rule: BudgetRule,
    ) -> Result<Budget, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::Validation("budget name must not be empty".into()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "budget amount must be positive, got {}",
                amount
            )));
        }
        let range = DateRange::new(range.from, range.to)?;
        let category_allocations = BudgetAllocator::allocate(&rule, amount)?;
        Ok(Budget {
            id: Uuid::new_v4(),
            name,
            amount,
            start_date: range.from,
            end_date: range.to,
            period_type,
            rule,
            category_allocations,
            status: BudgetStatus::Draft,
            replaced_by: None,
        })
    }

    /// Assigns an expense category to a group of the budget.
    pub fn assign_category(
        budget: &mut Budget,
        catalog: &CategoryCatalog,
        category_id: Uuid,
        group_index: usize,
    ) -> Result<(), CoreError> {
        let category = catalog.get(category_id).ok_or_else(|| {
            CoreError::Validation(format!("unknown category {} referenced", category_id))
        })?;
        if category.kind != CategoryKind::Expense {
            return Err(CoreError::Validation(format!(
                "only expense categories can be budgeted, `{}` is {}",
                category.name, category.kind
            )));
        }
        BudgetAllocator::assign_category(&mut budget.category_allocations, category_id, group_index)
    }

    /// Activates a draft budget. Another active budget is only replaced when the caller
    /// confirms; otherwise nothing is modified and the conflict is reported.
    pub fn activate(
        budgets: &mut [Budget],
        id: Uuid,
        confirmation: ActivationConfirmation,
        now: DateTime<Utc>,
    ) -> Result<Activation, CoreError> {
        let target = budgets
            .iter()
            .position(|budget| budget.id == id)
            .ok_or(CoreError::BudgetNotFound(id))?;

        match budgets[target].effective_status(now) {
            BudgetStatus::Active => {
                return Ok(Activation {
                    activated: id,
                    replaced: Vec::new(),
                    expired: Vec::new(),
                    already_active: true,
                })
            }
            BudgetStatus::Expired => {
                return Err(CoreError::Validation(format!(
                    "budget `{}` has expired and cannot be activated",
                    budgets[target].name
                )))
            }
            BudgetStatus::Draft => {}
        }
        BudgetAllocator::validate_groups(&budgets[target].category_allocations)?;

        let mut lapsed = Vec::new();
        let mut conflicting = Vec::new();
        for (index, budget) in budgets.iter().enumerate() {
            if index == target || budget.status != BudgetStatus::Active {
                continue;
            }
            if budget.effective_status(now) == BudgetStatus::Expired {
                lapsed.push(index);
            } else {
                conflicting.push(index);
            }
        }

        if let Some(&first) = conflicting.first() {
            if confirmation != ActivationConfirmation::ReplaceActive {
                return Err(CoreError::ActivationRequiresConfirmation {
                    requested: id,
                    active: budgets[first].id,
                });
            }
        }

        let mut expired = Vec::with_capacity(lapsed.len());
        for index in lapsed {
            budgets[index].status = BudgetStatus::Expired;
            expired.push(budgets[index].id);
            info!(budget = %budgets[index].id, "budget expired");
        }
        let mut replaced = Vec::with_capacity(conflicting.len());
        for index in conflicting {
            let previous = &mut budgets[index];
            previous.status = BudgetStatus::Expired;
            previous.replaced_by = Some(id);
            replaced.push(previous.id);
            info!(budget = %previous.id, replaced_by = %id, "budget replaced");
        }
        budgets[target].status = BudgetStatus::Active;
        info!(budget = %id, "budget activated");

        Ok(Activation {
            activated: id,
            replaced,
            expired,
            already_active: false,
        })
    }

    /// The budget active at `now`, taking lazy expiry into account.
    pub fn active_budget(budgets: &[Budget], now: DateTime<Utc>) -> Option<&Budget> {
        budgets
            .iter()
            .filter(|budget| budget.is_active_at(now))
            .max_by(|a, b| a.start_date.cmp(&b.start_date).then(b.id.cmp(&a.id)))
    }

    /// Persists lazy expiry: every non-expired budget past its end date becomes expired.
    /// Returns the ids whose stored status changed.
    pub fn expire_elapsed(budgets: &mut [Budget], now: DateTime<Utc>) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for budget in budgets.iter_mut() {
            if budget.status != BudgetStatus::Expired
                && budget.effective_status(now) == BudgetStatus::Expired
            {
                budget.status = BudgetStatus::Expired;
                changed.push(budget.id);
                info!(budget = %budget.id, "budget expired");
            }
        }
        changed
    }
}
