use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// A single income or expense entry as stored for a user.
///
/// `date` stays as the stored `YYYY-MM-DD` text; the assistant parses it and
/// skips records where that fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(alias = "title")]
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: String,
    #[serde(default = "default_is_expense", alias = "isExpense")]
    pub is_expense: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

fn default_is_expense() -> bool {
    true
}

/// A budget bucket with running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCategory {
    pub id: String,
    pub category: String,
    pub allocated: f64,
    pub spent: f64,
    pub remaining: f64,
    pub period: String,
    pub color: String,
    pub icon: String,
}

/// Everything the store holds for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialData {
    pub budget: f64,
    pub used: f64,
    pub transactions: Vec<Transaction>,
    pub custom_categories: Vec<CustomCategory>,
}
