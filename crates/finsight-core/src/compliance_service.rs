//! Compares aggregated spend against allocated budget limits.
//!
//! Every function here is pure and infallible: an unassigned category has a limit of
//! zero and a spending percentage of zero rather than an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use finsight_domain::{
    AllocationGroup, Budget, Category, ComplianceResult, DateRange, GroupCompliance, MonthKey,
    Transaction,
};

use crate::SpendingAggregator;

pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    /// Spend of `category_id` between the budget start and `as_of` (exclusive, capped at
    /// the budget end) against the limit of the group holding the category.
    pub fn evaluate(
        category_id: Uuid,
        budget: &Budget,
        txns: &[Transaction],
        as_of: DateTime<Utc>,
    ) -> ComplianceResult {
        let limit = budget
            .group_of(category_id)
            .map(|(_, group)| group.limit(budget.amount))
            .unwrap_or(0.0);
        let spending = Self::window(budget, as_of)
            .map(|range| SpendingAggregator::sum_by_category(txns, category_id, &range))
            .unwrap_or(0.0);
        ComplianceResult::from_parts(spending, limit)
    }

    /// Group-level result plus one result per assigned category.
    pub fn evaluate_group(
        group: &AllocationGroup,
        budget: &Budget,
        txns: &[Transaction],
        as_of: DateTime<Utc>,
    ) -> GroupCompliance {
        let limit = group.limit(budget.amount);
        let window = Self::window(budget, as_of);
        let spending = window
            .map(|range| SpendingAggregator::sum_by_group(txns, group, &range))
            .unwrap_or(0.0);
        let categories: BTreeMap<Uuid, ComplianceResult> = group
            .categories
            .iter()
            .map(|category_id| {
                let spent = window
                    .map(|range| SpendingAggregator::sum_by_category(txns, *category_id, &range))
                    .unwrap_or(0.0);
                (*category_id, ComplianceResult::from_parts(spent, limit))
            })
            .collect();
        GroupCompliance {
            name: group.name.clone(),
            percentage: group.percentage,
            result: ComplianceResult::from_parts(spending, limit),
            categories,
        }
    }

    /// One [`GroupCompliance`] per allocation group, in allocation order.
    pub fn evaluate_budget(
        budget: &Budget,
        txns: &[Transaction],
        as_of: DateTime<Utc>,
    ) -> Vec<GroupCompliance> {
        budget
            .category_allocations
            .iter()
            .map(|group| Self::evaluate_group(group, budget, txns, as_of))
            .collect()
    }

    /// Checks a category's own monthly limit, when it has one.
    pub fn evaluate_monthly_limit(
        category: &Category,
        txns: &[Transaction],
        month: MonthKey,
    ) -> Option<ComplianceResult> {
        let limit = category.monthly_limit?;
        let spent = SpendingAggregator::sum_by_category(txns, category.id, &month.range());
        Some(ComplianceResult::from_parts(spent, limit))
    }

    fn window(budget: &Budget, as_of: DateTime<Utc>) -> Option<DateRange> {
        budget.range().truncate_at(as_of)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use finsight_domain::{BudgetPeriodType, BudgetRule, CategoryKind, FixedRule};

    use super::*;
    use crate::{BudgetAllocator, BudgetService};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn budget() -> Budget {
        BudgetService::create(
            "Household",
            2000.0,
            DateRange::new(at(2024, 5, 1), at(2024, 6, 1)).unwrap(),
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::FiftyThirtyTwenty),
        )
        .unwrap()
    }

    #[test]
    fn unassigned_category_has_zero_limit() {
        let stray = Uuid::new_v4();
        let txns = vec![Transaction::completed_expense(12.0, stray, at(2024, 5, 3))];
        let result = ComplianceEvaluator::evaluate(stray, &budget(), &txns, at(2024, 5, 20));
        assert_eq!(result.budget_limit, 0.0);
        assert_eq!(result.spending_percentage, 0.0);
        assert!(!result.within_budget);

        let idle = ComplianceEvaluator::evaluate(Uuid::new_v4(), &budget(), &txns, at(2024, 5, 20));
        assert!(idle.within_budget);
    }

    #[test]
    fn spend_is_counted_up_to_as_of() {
        let mut budget = budget();
        let food = Uuid::new_v4();
        BudgetAllocator::assign_category(&mut budget.category_allocations, food, 1).unwrap();
        let txns = vec![
            Transaction::completed_expense(150.0, food, at(2024, 5, 2)),
            Transaction::completed_expense(450.0, food, at(2024, 5, 25)),
            Transaction::completed_expense(99.0, food, at(2024, 4, 30)),
        ];

        let mid = ComplianceEvaluator::evaluate(food, &budget, &txns, at(2024, 5, 10));
        assert_eq!(mid.current_spending, 150.0);
        assert_eq!(mid.budget_limit, 600.0);
        assert_eq!(mid.spending_percentage, 25.0);

        let end = ComplianceEvaluator::evaluate(food, &budget, &txns, at(2024, 8, 1));
        assert_eq!(end.current_spending, 600.0);
        assert!(end.within_budget);
        assert_eq!(end.remaining_budget, 0.0);

        let before = ComplianceEvaluator::evaluate(food, &budget, &txns, at(2024, 4, 1));
        assert_eq!(before.current_spending, 0.0);
    }

    #[test]
    fn budget_report_lists_every_group() {
        let mut budget = budget();
        let rent = Uuid::new_v4();
        BudgetAllocator::assign_category(&mut budget.category_allocations, rent, 0).unwrap();
        let txns = vec![Transaction::completed_expense(1200.0, rent, at(2024, 5, 1))];
        let report = ComplianceEvaluator::evaluate_budget(&budget, &txns, at(2024, 5, 31));
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].name, "Needs");
        assert!(!report[0].result.within_budget);
        assert_eq!(report[0].categories[&rent].spending_percentage, 120.0);
        assert_eq!(report[2].result.current_spending, 0.0);
    }

    #[test]
    fn monthly_limit_only_when_set() {
        let month = MonthKey::new(2024, 5).unwrap();
        let plain = Category::new("Dining", CategoryKind::Expense);
        assert!(ComplianceEvaluator::evaluate_monthly_limit(&plain, &[], month).is_none());
        let capped = Category::new("Dining", CategoryKind::Expense).with_monthly_limit(200.0);
        let txns = vec![Transaction::completed_expense(50.0, capped.id, at(2024, 5, 9))];
        let result = ComplianceEvaluator::evaluate_monthly_limit(&capped, &txns, month).unwrap();
        assert_eq!(result.spending_percentage, 25.0);
    }
}
