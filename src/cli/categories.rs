use colored::Colorize;
use comfy_table::{Cell, Table};

use super::expenses::new_id;
use super::open_store;
use crate::error::Result;
use crate::fmt::money;
use crate::models::CustomCategory;
use crate::store::TransactionStore;

pub struct NewCategory<'a> {
    pub name: &'a str,
    pub allocated: f64,
    pub period: &'a str,
    pub color: &'a str,
    pub icon: &'a str,
    pub id: Option<&'a str>,
}

pub fn add(user: &str, new: NewCategory<'_>) -> Result<()> {
    let store = open_store()?;
    let category = CustomCategory {
        id: new.id.map(str::to_string).unwrap_or_else(new_id),
        category: new.name.to_string(),
        allocated: new.allocated,
        spent: 0.0,
        remaining: new.allocated,
        period: new.period.to_string(),
        color: new.color.to_string(),
        icon: new.icon.to_string(),
    };
    store.add_category(user, &category)?;
    println!(
        "Added category {} ({}) with {}",
        category.category,
        category.id,
        money(category.allocated)
    );
    Ok(())
}

pub fn list(user: &str) -> Result<()> {
    let store = open_store()?;
    store.user(user)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Category", "Allocated", "Spent", "Remaining", "Period", "Icon"]);
    for c in store.custom_categories(user)? {
        let remaining = if c.remaining < 0.0 {
            money(c.remaining).red().to_string()
        } else {
            money(c.remaining)
        };
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.category),
            Cell::new(money(c.allocated)),
            Cell::new(money(c.spent)),
            Cell::new(remaining),
            Cell::new(c.period),
            Cell::new(c.icon),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub struct CategoryChanges {
    pub name: Option<String>,
    pub allocated: Option<f64>,
    pub spent: Option<f64>,
    pub period: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

pub fn update(user: &str, id: &str, changes: CategoryChanges) -> Result<()> {
    let store = open_store()?;
    let mut category = store.category(user, id)?;
    if let Some(name) = changes.name {
        category.category = name;
    }
    if let Some(allocated) = changes.allocated {
        category.allocated = allocated;
    }
    if let Some(spent) = changes.spent {
        category.spent = spent;
    }
    if let Some(period) = changes.period {
        category.period = period;
    }
    if let Some(color) = changes.color {
        category.color = color;
    }
    if let Some(icon) = changes.icon {
        category.icon = icon;
    }
    store.update_category(user, &category)?;
    println!(
        "Updated {}: {} remaining of {}",
        category.category,
        money(category.allocated - category.spent),
        money(category.allocated)
    );
    Ok(())
}

pub fn delete(user: &str, id: &str) -> Result<()> {
    let store = open_store()?;
    let removed = store.delete_category(user, id)?;
    println!("Deleted category {} ({id})", removed.category);
    Ok(())
}
