//! Turns transactions into the fixed-shape rows the classifier consumes.
//!
//! Records that cannot be turned into a row (unparseable date, non-finite
//! amount, blank label when training) are skipped with a warning rather than
//! failing the batch. The spending analyzer follows the same policy.

use chrono::{Datelike, Local, NaiveDate};

use crate::models::Transaction;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const FEATURE_NAMES: [&str; 6] = [
    "amount",
    "day_of_week",
    "day_of_month",
    "month",
    "word_count",
    "has_number",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub amount: f64,
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub month: u32,
    pub word_count: usize,
    pub has_number: bool,
}

impl FeatureRow {
    pub fn new(amount: f64, date: NaiveDate, description: &str) -> Self {
        Self {
            amount,
            day_of_week: date.weekday().num_days_from_monday(),
            day_of_month: date.day(),
            month: date.month(),
            word_count: description.split_whitespace().count(),
            has_number: description.chars().any(|c| c.is_ascii_digit()),
        }
    }

    /// Values in `FEATURE_NAMES` order.
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.amount,
            f64::from(self.day_of_week),
            f64::from(self.day_of_month),
            f64::from(self.month),
            self.word_count as f64,
            if self.has_number { 1.0 } else { 0.0 },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub features: FeatureRow,
    pub category: String,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Why a record was left out of a batch.
pub fn record_problem(txn: &Transaction) -> Option<&'static str> {
    if !txn.amount.is_finite() {
        Some("amount is not a finite number")
    } else if parse_date(&txn.date).is_none() {
        Some("date is not YYYY-MM-DD")
    } else {
        None
    }
}

fn row_for(index: usize, txn: &Transaction) -> Option<FeatureRow> {
    if let Some(problem) = record_problem(txn) {
        tracing::warn!(index, id = %txn.id, date = %txn.date, "skipping record: {problem}");
        return None;
    }
    let date = parse_date(&txn.date)?;
    Some(FeatureRow::new(txn.amount, date, &txn.description))
}

/// One row per usable record, in input order. `None` when there is nothing
/// to extract from.
pub fn extract(transactions: &[Transaction]) -> Option<Vec<FeatureRow>> {
    if transactions.is_empty() {
        return None;
    }
    Some(
        transactions
            .iter()
            .enumerate()
            .filter_map(|(i, t)| row_for(i, t))
            .collect(),
    )
}

/// Like [`extract`] but keeps the category label, dropping unlabeled records.
pub fn extract_labeled(transactions: &[Transaction]) -> Option<Vec<LabeledRow>> {
    if transactions.is_empty() {
        return None;
    }
    let rows = transactions
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            if t.category.trim().is_empty() {
                tracing::warn!(index = i, id = %t.id, "skipping record: no category label");
                return None;
            }
            row_for(i, t).map(|features| LabeledRow {
                features,
                category: t.category.clone(),
            })
        })
        .collect();
    Some(rows)
}

/// Partial transaction used for prediction; missing parts take defaults.
#[derive(Debug, Clone, Default)]
pub struct PredictionInput {
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl PredictionInput {
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow::new(
            self.amount.unwrap_or(0.0),
            self.date.unwrap_or_else(|| Local::now().date_naive()),
            self.description.as_deref().unwrap_or(""),
        )
    }
}
