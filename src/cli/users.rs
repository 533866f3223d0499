use colored::Colorize;
use comfy_table::{Cell, Table};

use super::open_store;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;

pub fn register(id: &str, email: &str, name: &str, budget: Option<f64>) -> Result<()> {
    let mut store = open_store()?;
    let budget = budget.unwrap_or_else(|| load_settings().default_budget);
    let user = store.register_user(id, email, name, budget)?;
    println!("Registered {} <{}> with a budget of {}", user.id, user.email, money(budget));
    Ok(())
}

pub fn set_budget(id: &str, amount: f64) -> Result<()> {
    let store = open_store()?;
    store.set_budget(id, amount)?;
    println!("Budget for {id} is now {}", money(amount));
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let store = open_store()?;
    let user = store.user(id)?;
    let data = store.financial_data(id)?;

    let left = data.budget - data.used;
    let left_text = if left >= 0.0 {
        money(left).green()
    } else {
        money(left).red()
    };
    println!("{} <{}>", user.name.bold(), user.email);
    println!("Budget {}  used {}  left {}", money(data.budget), money(data.used), left_text);

    let mut table = Table::new();
    table.set_header(vec!["ID", "Category", "Allocated", "Spent", "Remaining", "Period"]);
    for c in &data.custom_categories {
        table.add_row(vec![
            Cell::new(&c.id),
            Cell::new(&c.category),
            Cell::new(money(c.allocated)),
            Cell::new(money(c.spent)),
            Cell::new(money(c.remaining)),
            Cell::new(&c.period),
        ]);
    }
    println!("Categories\n{table}");
    println!("{} transactions", data.transactions.len());
    Ok(())
}
