//! Month-over-month totals, growth, thresholded trend direction, and category ranking.

use std::collections::BTreeMap;

use uuid::Uuid;

use finsight_domain::{
    CategoryKind, CategoryTrend, DateRange, MonthKey, RankedCategory, Transaction, TrendDirection,
    UnusualSpending,
};

use crate::{CategoryCatalog, CoreError, SpendFilter, SpendingAggregator};

/// Per-category monthly series, zero-filled over a fixed list of months.
pub type CategorySeries = BTreeMap<Uuid, Vec<f64>>;

pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// Completed expense totals keyed by UTC month.
    pub fn monthly_totals(txns: &[Transaction]) -> BTreeMap<MonthKey, f64> {
        Self::monthly_totals_with(txns, CategoryKind::Expense, SpendFilter::completed())
    }

    pub fn monthly_totals_with(
        txns: &[Transaction],
        kind: CategoryKind,
        filter: SpendFilter,
    ) -> BTreeMap<MonthKey, f64> {
        let mut totals = BTreeMap::new();
        for txn in txns.iter().filter(|t| t.kind == kind && filter.admits(t)) {
            *totals.entry(MonthKey::of(txn.created_at)).or_insert(0.0) += txn.magnitude();
        }
        totals
    }

    /// Totals for exactly `months`, with months lacking activity reported as zero.
    pub fn monthly_totals_in(
        txns: &[Transaction],
        months: &[MonthKey],
        filter: SpendFilter,
    ) -> BTreeMap<MonthKey, f64> {
        let all = Self::monthly_totals_with(txns, CategoryKind::Expense, filter);
        months
            .iter()
            .map(|month| (*month, all.get(month).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Average and direction of a month-ordered series.
    pub fn trend(monthly: &BTreeMap<MonthKey, f64>, epsilon_percent: f64) -> CategoryTrend {
        let values: Vec<f64> = monthly.values().copied().collect();
        Self::trend_of(&values, epsilon_percent)
    }

    /// The most recent value is compared with the mean of the values before it; it must
    /// move by more than `epsilon_percent` of that mean to count as a change.
    pub fn trend_of(values: &[f64], epsilon_percent: f64) -> CategoryTrend {
        let average = mean(values);
        let Some((&recent, earlier)) = values.split_last() else {
            return CategoryTrend {
                average,
                trend: TrendDirection::Stable,
            };
        };
        if earlier.is_empty() {
            return CategoryTrend {
                average,
                trend: TrendDirection::Stable,
            };
        }
        let trailing = mean(earlier);
        let margin = trailing.abs() * epsilon_percent / 100.0;
        let trend = if recent > trailing + margin {
            TrendDirection::Increasing
        } else if recent < trailing - margin {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        CategoryTrend { average, trend }
    }

    /// `(last - first) / first * 100` across the series; 0 when `first` is 0 or
    /// fewer than two months are present.
    pub fn growth_rate(monthly: &BTreeMap<MonthKey, f64>) -> f64 {
        if monthly.len() < 2 {
            return 0.0;
        }
        let (Some(first), Some(last)) = (monthly.values().next(), monthly.values().next_back())
        else {
            return 0.0;
        };
        if *first == 0.0 {
            return 0.0;
        }
        (last - first) / first * 100.0
    }

    /// Expense categories ranked by amount within `range`, merged by display name.
    /// Equal amounts are ordered by the earliest category id.
    pub fn top_expense_categories(
        txns: &[Transaction],
        catalog: &CategoryCatalog,
        range: &DateRange,
        limit: usize,
    ) -> Result<Vec<RankedCategory>, CoreError> {
        let totals = SpendingAggregator::totals_by_category(
            txns,
            CategoryKind::Expense,
            range,
            SpendFilter::completed(),
        );
        let grand_total: f64 = totals.values().sum();

        let mut by_name: BTreeMap<String, (Uuid, f64)> = BTreeMap::new();
        for (category_id, amount) in totals {
            let category = catalog.require(category_id)?;
            let entry = by_name
                .entry(category.name.clone())
                .or_insert((category_id, 0.0));
            entry.0 = entry.0.min(category_id);
            entry.1 += amount;
        }

        let mut ranked: Vec<RankedCategory> = by_name
            .into_iter()
            .map(|(name, (category_id, amount))| RankedCategory {
                name,
                category_id,
                amount,
                percentage: if grand_total > 0.0 {
                    amount / grand_total * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Expense series per category over `months`, zero-filled.
    pub fn category_series(
        txns: &[Transaction],
        months: &[MonthKey],
        filter: SpendFilter,
    ) -> CategorySeries {
        let index: BTreeMap<MonthKey, usize> =
            months.iter().enumerate().map(|(i, m)| (*m, i)).collect();
        let mut series = CategorySeries::new();
        for txn in txns
            .iter()
            .filter(|t| t.kind == CategoryKind::Expense && filter.admits(t))
        {
            let Some(&slot) = index.get(&MonthKey::of(txn.created_at)) else {
                continue;
            };
            let values = series
                .entry(txn.category_id)
                .or_insert_with(|| vec![0.0; months.len()]);
            values[slot] += txn.magnitude();
        }
        series
    }

    /// Trend of every category with spend in the window.
    pub fn category_trends(series: &CategorySeries, epsilon_percent: f64) -> BTreeMap<Uuid, CategoryTrend> {
        series
            .iter()
            .map(|(category_id, values)| (*category_id, Self::trend_of(values, epsilon_percent)))
            .collect()
    }

    /// Income minus expense for each of `months`.
    pub fn monthly_net(
        txns: &[Transaction],
        months: &[MonthKey],
        filter: SpendFilter,
    ) -> BTreeMap<MonthKey, f64> {
        months
            .iter()
            .map(|month| {
                let range = month.range();
                let income = SpendingAggregator::total(txns, CategoryKind::Income, &range, filter);
                let expense = SpendingAggregator::total(txns, CategoryKind::Expense, &range, filter);
                (*month, income - expense)
            })
            .collect()
    }

    /// Flags the last value of a series when it exceeds the mean of the earlier values by
    /// more than `threshold_percent`. Series without a positive earlier average never flag.
    /// Months without spending count as zero in that mean.
    pub fn detect_unusual(
        category_id: Uuid,
        values: &[f64],
        threshold_percent: f64,
    ) -> Option<UnusualSpending> {
        let (&current, earlier) = values.split_last()?;
        let average = mean(earlier);
        if average <= 0.0 {
            return None;
        }
        let increase = (current - average) / average * 100.0;
        (increase > threshold_percent).then_some(UnusualSpending {
            category_id,
            amount: current,
            percentage_increase: increase,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
