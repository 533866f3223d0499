//! Rule-based extraction of an expense from spoken or typed text.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::features::PredictionInput;
use crate::error::{BuddyError, Result};

/// Checked top to bottom; the first category with any keyword in the text
/// wins.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "food",
        &[
            "food", "grocery", "groceries", "restaurant", "lunch", "dinner", "breakfast", "meal",
            "coffee",
        ],
    ),
    (
        "transport",
        &["transport", "bus", "train", "uber", "lyft", "taxi", "car", "gas", "fuel"],
    ),
    (
        "entertainment",
        &["entertainment", "movie", "game", "concert", "show", "netflix", "subscription"],
    ),
    (
        "shopping",
        &["shopping", "clothes", "shoes", "retail", "amazon", "purchase"],
    ),
    (
        "housing",
        &["housing", "rent", "mortgage", "utility", "electric", "water", "bill"],
    ),
    (
        "health",
        &["health", "doctor", "medical", "medicine", "pharmacy", "drug", "prescription"],
    ),
];

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$?([0-9]+(?:\.[0-9]{2})?)").expect("valid amount pattern"))
}

/// Transaction fields recovered from free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceDraft {
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: String,
    pub date: NaiveDate,
}

impl VoiceDraft {
    pub fn require_amount(&self) -> Result<f64> {
        self.amount
            .ok_or_else(|| BuddyError::ParseAmbiguous(self.description.clone()))
    }

    pub fn prediction_input(&self) -> PredictionInput {
        PredictionInput {
            amount: self.amount,
            date: Some(self.date),
            description: Some(self.description.clone()),
        }
    }
}

/// First amount in the text. Digit runs too long to fit a finite `f64` count
/// as no amount.
pub fn extract_amount(text: &str) -> Option<f64> {
    amount_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
}

pub fn detect_category(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
}

/// Parse `text` as if spoken on `today`.
pub fn parse_on(text: &str, today: NaiveDate) -> VoiceDraft {
    VoiceDraft {
        amount: extract_amount(text),
        category: detect_category(text).map(str::to_string),
        description: text.to_string(),
        date: today,
    }
}

pub fn parse(text: &str) -> VoiceDraft {
    parse_on(text, Local::now().date_naive())
}
