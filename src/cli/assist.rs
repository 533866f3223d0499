use colored::Colorize;
use comfy_table::{Cell, Table};

use super::expenses::{checked_date, new_id};
use super::{assistant, open_store};
use crate::ai::features::parse_date;
use crate::ai::{InsightData, PredictionInput};
use crate::error::{BuddyError, Result};
use crate::fmt::{money, percent};
use crate::models::Transaction;

/// Category given to a saved voice draft when neither keywords nor the
/// model produced one.
const FALLBACK_CATEGORY: &str = "uncategorized";

pub fn train() -> Result<()> {
    let store = open_store()?;
    let outcome = assistant().train_from_store(&store)?;
    if outcome.success {
        println!("{}", outcome.message.green());
        if let Some(accuracy) = outcome.accuracy {
            println!("Held-out accuracy: {}", percent(accuracy));
        }
    } else {
        println!("{}", outcome.message.yellow());
    }
    Ok(())
}

pub fn predict(amount: Option<f64>, date: Option<&str>, description: Option<String>) -> Result<()> {
    let date = match date {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| {
            BuddyError::InvalidRecord(format!("date {raw:?} is not YYYY-MM-DD"))
        })?),
        None => None,
    };
    let input = PredictionInput {
        amount,
        date,
        description,
    };
    let category = assistant().predict(&input)?;
    println!("{category}");
    Ok(())
}

pub fn suggest(user: &str) -> Result<()> {
    let store = open_store()?;
    store.user(user)?;
    let suggestions = assistant().suggest_for_user(&store, user)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Amount", "Category", "Suggested"]);
    let mut differing = 0;
    for (t, suggested) in suggestions {
        let suggested = if suggested.eq_ignore_ascii_case(&t.category) {
            suggested
        } else {
            differing += 1;
            suggested.yellow().to_string()
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.description),
            Cell::new(money(t.amount)),
            Cell::new(t.category),
            Cell::new(suggested),
        ]);
    }
    println!("Suggested categories\n{table}");
    println!("{differing} transactions differ from the model's suggestion");
    Ok(())
}

pub fn voice(text: &str, user: Option<&str>, save: bool, json: bool) -> Result<()> {
    let draft = assistant().process_voice(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
    } else {
        let amount = draft.amount.map(money).unwrap_or_else(|| "?".to_string());
        let category = draft.category.as_deref().unwrap_or("?");
        println!("Amount:   {amount}");
        println!("Category: {category}");
        println!("Date:     {}", draft.date);
    }

    if let (true, Some(user)) = (save, user) {
        let amount = draft.require_amount()?;
        let mut store = open_store()?;
        let txn = Transaction {
            id: new_id(),
            description: draft.description.clone(),
            amount,
            category: draft
                .category
                .clone()
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
            date: checked_date(Some(&draft.date.to_string()))?,
            is_expense: true,
            icon: None,
        };
        let stored = store.add_expense(user, txn)?;
        println!("Saved {} in {} [{}]", money(stored.amount), stored.category, stored.id);
    }
    Ok(())
}

pub fn insights(user: &str, json: bool) -> Result<()> {
    let store = open_store()?;
    store.user(user)?;
    let found = assistant().insights_for_user(&store, user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    if found.is_empty() {
        println!("No spending recorded yet.");
        return Ok(());
    }
    for insight in &found {
        println!("{}", insight.text.bold());
        match &insight.data {
            InsightData::TopCategories(totals) => {
                let mut table = Table::new();
                table.set_header(vec!["Category", "Total"]);
                for t in totals {
                    table.add_row(vec![Cell::new(&t.category), Cell::new(money(t.total))]);
                }
                println!("{table}");
            }
            InsightData::Trend(trend) => {
                println!(
                    "  {} {}  ->  {} {}",
                    trend.previous_month,
                    money(trend.previous),
                    trend.latest_month,
                    money(trend.latest)
                );
            }
        }
    }
    Ok(())
}
