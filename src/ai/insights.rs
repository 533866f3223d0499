//! Spending insights: where the money goes and how this month compares with
//! the last one.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::features::{parse_date, record_problem};
use crate::error::{BuddyError, Result};
use crate::models::Transaction;

/// How many categories the top-categories insight carries in its data.
const TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TopCategories,
    Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCategoryTotal {
    pub month: String,
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendData {
    pub previous_month: String,
    pub latest_month: String,
    pub previous: f64,
    pub latest: f64,
    /// Percent change from `previous` to `latest`.
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightData {
    TopCategories(Vec<CategoryTotal>),
    Trend(TrendData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub text: String,
    pub data: InsightData,
}

/// Aggregates behind the insights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpendingSummary {
    /// Sorted by month, then category.
    pub monthly_by_category: Vec<MonthlyCategoryTotal>,
    /// All-time totals in first-seen order.
    pub category_totals: Vec<CategoryTotal>,
    /// `(YYYY-MM, total)` sorted by month.
    pub monthly_totals: Vec<(String, f64)>,
}

impl SpendingSummary {
    pub fn is_empty(&self) -> bool {
        self.category_totals.is_empty()
    }

    /// Highest totals first; equal totals keep first-seen order.
    pub fn top_categories(&self, n: usize) -> Vec<CategoryTotal> {
        let mut ranked = self.category_totals.clone();
        ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
        ranked.truncate(n);
        ranked
    }
}

/// Sum expenses by month and category. Income and malformed records are
/// left out; the latter with a warning.
pub fn summarize(transactions: &[Transaction]) -> SpendingSummary {
    let mut by_month_category: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    let mut category_index: HashMap<String, usize> = HashMap::new();
    let mut category_totals: Vec<CategoryTotal> = Vec::new();

    for (index, txn) in transactions.iter().enumerate() {
        if !txn.is_expense {
            continue;
        }
        if let Some(problem) = record_problem(txn) {
            tracing::warn!(index, id = %txn.id, "leaving record out of insights: {problem}");
            continue;
        }
        let Some(date) = parse_date(&txn.date) else {
            continue;
        };
        let month = date.format("%Y-%m").to_string();

        *by_month_category
            .entry((month.clone(), txn.category.clone()))
            .or_insert(0.0) += txn.amount;
        *by_month.entry(month).or_insert(0.0) += txn.amount;

        let slot = *category_index.entry(txn.category.clone()).or_insert_with(|| {
            category_totals.push(CategoryTotal {
                category: txn.category.clone(),
                total: 0.0,
            });
            category_totals.len() - 1
        });
        category_totals[slot].total += txn.amount;
    }

    SpendingSummary {
        monthly_by_category: by_month_category
            .into_iter()
            .map(|((month, category), total)| MonthlyCategoryTotal {
                month,
                category,
                total,
            })
            .collect(),
        category_totals,
        monthly_totals: by_month.into_iter().collect(),
    }
}

pub fn top_categories_insight(summary: &SpendingSummary) -> Option<Insight> {
    let top = summary.top_categories(TOP_N);
    let first = top.first()?;
    Some(Insight {
        kind: InsightKind::TopCategories,
        text: format!(
            "Your top spending category is {} with ${:.2}",
            first.category, first.total
        ),
        data: InsightData::TopCategories(top),
    })
}

/// Latest month against the month before it. `Ok(None)` with fewer than two
/// months of data.
pub fn trend_insight(summary: &SpendingSummary) -> Result<Option<Insight>> {
    let [.., (previous_month, previous), (latest_month, latest)] = summary.monthly_totals.as_slice()
    else {
        return Ok(None);
    };
    if *previous == 0.0 {
        return Err(BuddyError::InsightUnavailable(format!(
            "no spending in {previous_month} to compare {latest_month} against"
        )));
    }

    let change = (latest - previous) / previous * 100.0;
    let text = if change > 0.0 {
        format!("Your spending increased by {:.1}% compared to last month", change.abs())
    } else if change < 0.0 {
        format!("Your spending decreased by {:.1}% compared to last month", change.abs())
    } else {
        "Your spending did not change compared to last month".to_string()
    };

    Ok(Some(Insight {
        kind: InsightKind::Trend,
        text,
        data: InsightData::Trend(TrendData {
            previous_month: previous_month.clone(),
            latest_month: latest_month.clone(),
            previous: *previous,
            latest: *latest,
            change,
        }),
    }))
}

/// Top categories first, then the trend when it can be computed.
pub fn analyze(transactions: &[Transaction]) -> Vec<Insight> {
    let summary = summarize(transactions);
    let mut insights = Vec::new();
    if summary.is_empty() {
        tracing::debug!("no expenses to analyze");
        return insights;
    }
    tracing::debug!(breakdown = ?summary.monthly_by_category, "monthly spending by category");
    if let Some(top) = top_categories_insight(&summary) {
        insights.push(top);
    }
    match trend_insight(&summary) {
        Ok(Some(trend)) => insights.push(trend),
        Ok(None) => {}
        Err(e) => tracing::info!("skipping trend insight: {e}"),
    }
    insights
}
