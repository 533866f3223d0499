use chrono::Local;
use comfy_table::{Cell, Table};

use super::open_store;
use crate::ai::features::{parse_date, DATE_FORMAT};
use crate::error::{BuddyError, Result};
use crate::fmt::money;
use crate::models::Transaction;
use crate::store::TransactionStore;

pub(crate) fn checked_date(date: Option<&str>) -> Result<String> {
    match date {
        None => Ok(Local::now().date_naive().format(DATE_FORMAT).to_string()),
        Some(raw) => parse_date(raw)
            .map(|d| d.format(DATE_FORMAT).to_string())
            .ok_or_else(|| BuddyError::InvalidRecord(format!("date {raw:?} is not YYYY-MM-DD"))),
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct NewExpense<'a> {
    pub title: &'a str,
    pub amount: f64,
    pub category: &'a str,
    pub date: Option<&'a str>,
    pub income: bool,
    pub id: Option<&'a str>,
}

pub fn add(user: &str, expense: NewExpense<'_>) -> Result<()> {
    let mut store = open_store()?;
    let txn = Transaction {
        id: expense.id.map(str::to_string).unwrap_or_else(new_id),
        description: expense.title.to_string(),
        amount: expense.amount,
        category: expense.category.to_string(),
        date: checked_date(expense.date)?,
        is_expense: !expense.income,
        icon: None,
    };
    let stored = store.add_expense(user, txn)?;
    println!(
        "Added {} {} ({}) on {} [{}]",
        if stored.is_expense { "expense" } else { "income" },
        money(stored.amount),
        stored.category,
        stored.date,
        stored.id
    );
    Ok(())
}

pub fn list(user: &str) -> Result<()> {
    let store = open_store()?;
    store.user(user)?;
    let rows = store.transactions(user)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Title", "Category", "Amount", "Type"]);
    for t in rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(t.description),
            Cell::new(t.category),
            Cell::new(money(t.amount)),
            Cell::new(if t.is_expense { "expense" } else { "income" }),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub struct ExpenseChanges {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub expense: Option<bool>,
}

pub fn update(user: &str, id: &str, changes: ExpenseChanges) -> Result<()> {
    let mut store = open_store()?;
    let mut txn = store.transaction(user, id)?;
    if let Some(title) = changes.title {
        txn.description = title;
    }
    if let Some(amount) = changes.amount {
        txn.amount = amount;
    }
    if let Some(category) = changes.category {
        txn.category = category;
    }
    if let Some(date) = changes.date {
        txn.date = checked_date(Some(&date))?;
    }
    if let Some(is_expense) = changes.expense {
        txn.is_expense = is_expense;
    }
    store.update_transaction(user, &txn)?;
    println!("Updated transaction {id}");
    Ok(())
}

pub fn delete(user: &str, id: &str) -> Result<()> {
    let mut store = open_store()?;
    let removed = store.delete_transaction(user, id)?;
    println!("Deleted transaction {id}: {} {}", removed.description, money(removed.amount));
    Ok(())
}
