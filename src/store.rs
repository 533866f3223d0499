use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{get_connection, init_db, DEFAULT_CATEGORIES, DEFAULT_CATEGORY_ALLOCATION};
use crate::error::{BuddyError, Result};
use crate::models::{CustomCategory, FinancialData, Transaction, User};

/// Read access the assistant needs. The assistant never writes through it.
pub trait TransactionStore {
    fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>>;
    fn custom_categories(&self, user_id: &str) -> Result<Vec<CustomCategory>>;
    /// Every user's transactions, pooled for training.
    fn all_transactions(&self) -> Result<Vec<Transaction>>;
}

pub struct SqliteStore {
    conn: Connection,
}

const TRANSACTION_COLUMNS: &str = "id, description, amount, category, date, is_expense, icon";
const CATEGORY_COLUMNS: &str = "id, category, allocated, spent, remaining, period, color, icon";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        is_expense: row.get(5)?,
        icon: row.get(6)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<CustomCategory> {
    Ok(CustomCategory {
        id: row.get(0)?,
        category: row.get(1)?,
        allocated: row.get(2)?,
        spent: row.get(3)?,
        remaining: row.get(4)?,
        period: row.get(5)?,
        color: row.get(6)?,
        icon: row.get(7)?,
    })
}

/// Move `delta` from `remaining` into `spent` on the first category whose
/// name matches case-insensitively. Unknown names are ignored.
fn apply_spend(conn: &Connection, user_id: &str, category: &str, delta: f64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE custom_categories SET spent = spent + ?3, remaining = remaining - ?3 \
         WHERE rowid = (SELECT rowid FROM custom_categories \
                        WHERE user_id = ?1 AND lower(category) = lower(?2) \
                        ORDER BY position LIMIT 1)",
        params![user_id, category, delta],
    )?;
    Ok(changed > 0)
}

/// Amounts must be finite, and expenses can't be negative.
fn check_amount(txn: &Transaction) -> Result<()> {
    if !txn.amount.is_finite() || (txn.is_expense && txn.amount < 0.0) {
        return Err(BuddyError::InvalidRecord(format!(
            "amount {} is not valid for transaction {}",
            txn.amount, txn.id
        )));
    }
    Ok(())
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self::new(conn))
    }

    /// Create a user with the starting budget and the six default categories.
    pub fn register_user(
        &mut self,
        id: &str,
        email: &str,
        name: &str,
        budget: f64,
    ) -> Result<User> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (id, email, name, budget) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, name, budget],
        )?;
        for (position, (cat_id, category, color, icon)) in DEFAULT_CATEGORIES.iter().enumerate() {
            tx.execute(
                "INSERT INTO custom_categories \
                 (user_id, id, category, allocated, spent, remaining, \
                  period, color, icon, position) \
                 VALUES (?1, ?2, ?3, ?4, 0, ?4, 'monthly', ?5, ?6, ?7)",
                params![
                    id,
                    cat_id,
                    category,
                    DEFAULT_CATEGORY_ALLOCATION,
                    color,
                    icon,
                    position as i64
                ],
            )?;
        }
        tx.commit()?;
        tracing::info!(user_id = id, "registered user");
        Ok(User {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        })
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.conn
            .query_row(
                "SELECT id, email, name FROM users WHERE id = ?1",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| BuddyError::UnknownUser(id.to_string()))
    }

    pub fn financial_data(&self, user_id: &str) -> Result<FinancialData> {
        let budget: f64 = self
            .conn
            .query_row("SELECT budget FROM users WHERE id = ?1", [user_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| BuddyError::UnknownUser(user_id.to_string()))?;
        let transactions = self.transactions(user_id)?;
        let used = transactions
            .iter()
            .filter(|t| t.is_expense)
            .map(|t| t.amount)
            .sum();
        Ok(FinancialData {
            budget,
            used,
            transactions,
            custom_categories: self.custom_categories(user_id)?,
        })
    }

    pub fn set_budget(&self, user_id: &str, budget: f64) -> Result<()> {
        let changed = self
            .conn
            .execute("UPDATE users SET budget = ?2 WHERE id = ?1", params![user_id, budget])?;
        if changed == 0 {
            return Err(BuddyError::UnknownUser(user_id.to_string()));
        }
        Ok(())
    }

    /// Store a transaction, inheriting the icon of its category and charging
    /// expenses against that category's running totals.
    pub fn add_expense(&mut self, user_id: &str, mut txn: Transaction) -> Result<Transaction> {
        check_amount(&txn)?;
        self.user(user_id)?;
        let tx = self.conn.transaction()?;
        if txn.icon.is_none() {
            txn.icon = tx
                .query_row(
                    "SELECT icon FROM custom_categories \
                     WHERE user_id = ?1 AND lower(category) = lower(?2) ORDER BY position LIMIT 1",
                    params![user_id, txn.category],
                    |row| row.get(0),
                )
                .optional()?;
        }
        tx.execute(
            "INSERT INTO transactions \
             (user_id, id, description, amount, category, date, is_expense, icon) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user_id,
                txn.id,
                txn.description,
                txn.amount,
                txn.category,
                txn.date,
                txn.is_expense,
                txn.icon
            ],
        )?;
        if txn.is_expense && !apply_spend(&tx, user_id, &txn.category, txn.amount)? {
            tracing::debug!(category = %txn.category, "no budget category to charge");
        }
        tx.commit()?;
        Ok(txn)
    }

    pub fn transaction(&self, user_id: &str, id: &str) -> Result<Transaction> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM transactions \
                     WHERE user_id = ?1 AND id = ?2"
                ),
                params![user_id, id],
                transaction_from_row,
            )
            .optional()?
            .ok_or_else(|| BuddyError::UnknownTransaction(id.to_string()))
    }

    /// Replace a stored transaction, moving its amount between categories.
    pub fn update_transaction(&mut self, user_id: &str, updated: &Transaction) -> Result<()> {
        check_amount(updated)?;
        let old = self.transaction(user_id, &updated.id)?;
        let tx = self.conn.transaction()?;
        if old.is_expense {
            apply_spend(&tx, user_id, &old.category, -old.amount)?;
        }
        tx.execute(
            "UPDATE transactions SET description = ?3, amount = ?4, category = ?5, date = ?6, \
             is_expense = ?7, icon = ?8 WHERE user_id = ?1 AND id = ?2",
            params![
                user_id,
                updated.id,
                updated.description,
                updated.amount,
                updated.category,
                updated.date,
                updated.is_expense,
                updated.icon
            ],
        )?;
        if updated.is_expense {
            apply_spend(&tx, user_id, &updated.category, updated.amount)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_transaction(&mut self, user_id: &str, id: &str) -> Result<Transaction> {
        let old = self.transaction(user_id, id)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM transactions WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        if old.is_expense {
            apply_spend(&tx, user_id, &old.category, -old.amount)?;
        }
        tx.commit()?;
        Ok(old)
    }

    pub fn add_category(&self, user_id: &str, category: &CustomCategory) -> Result<()> {
        self.user(user_id)?;
        self.conn.execute(
            "INSERT INTO custom_categories \
             (user_id, id, category, allocated, spent, remaining, period, color, icon, position) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, \
                     (SELECT COALESCE(MAX(position), -1) + 1 \
                      FROM custom_categories WHERE user_id = ?1))",
            params![
                user_id,
                category.id,
                category.category,
                category.allocated,
                category.spent,
                category.allocated - category.spent,
                category.period,
                category.color,
                category.icon
            ],
        )?;
        Ok(())
    }

    pub fn category(&self, user_id: &str, id: &str) -> Result<CustomCategory> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {CATEGORY_COLUMNS} FROM custom_categories \
                     WHERE user_id = ?1 AND id = ?2"
                ),
                params![user_id, id],
                category_from_row,
            )
            .optional()?
            .ok_or_else(|| BuddyError::UnknownCategory(id.to_string()))
    }

    /// Overwrite a category; `remaining` is always recomputed from the new
    /// `allocated` and `spent`.
    pub fn update_category(&self, user_id: &str, category: &CustomCategory) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE custom_categories SET category = ?3, allocated = ?4, spent = ?5, \
             remaining = ?6, \
             period = ?7, color = ?8, icon = ?9 WHERE user_id = ?1 AND id = ?2",
            params![
                user_id,
                category.id,
                category.category,
                category.allocated,
                category.spent,
                category.allocated - category.spent,
                category.period,
                category.color,
                category.icon
            ],
        )?;
        if changed == 0 {
            return Err(BuddyError::UnknownCategory(category.id.clone()));
        }
        Ok(())
    }

    pub fn delete_category(&self, user_id: &str, id: &str) -> Result<CustomCategory> {
        let old = self.category(user_id, id)?;
        self.conn.execute(
            "DELETE FROM custom_categories WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(old)
    }
}

impl TransactionStore for SqliteStore {
    fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?1 ORDER BY date, rowid"
        ))?;
        let rows = stmt
            .query_map([user_id], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn custom_categories(&self, user_id: &str) -> Result<Vec<CustomCategory>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM custom_categories WHERE user_id = ?1 ORDER BY position"
        ))?;
        let rows = stmt
            .query_map([user_id], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY user_id, date, rowid"
        ))?;
        let rows = stmt
            .query_map([], transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        store.register_user("u1", "ana@example.com", "Ana", 1000.0).unwrap();
        (dir, store)
    }

    fn txn(id: &str, amount: f64, category: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            description: format!("{category} purchase"),
            amount,
            category: category.to_string(),
            date: "2024-03-10".to_string(),
            is_expense: true,
            icon: None,
        }
    }

    fn category_named(store: &SqliteStore, name: &str) -> CustomCategory {
        store
            .custom_categories("u1")
            .unwrap()
            .into_iter()
            .find(|c| c.category.eq_ignore_ascii_case(name))
            .unwrap()
    }

    fn assert_balanced(store: &SqliteStore) {
        for c in store.custom_categories("u1").unwrap() {
            assert!(
                (c.remaining - (c.allocated - c.spent)).abs() < 1e-9,
                "{} out of balance: {c:?}",
                c.category
            );
        }
    }

    #[test]
    fn test_register_seeds_budget_and_categories() {
        let (_dir, store) = test_store();
        let data = store.financial_data("u1").unwrap();
        assert_eq!(data.budget, 1000.0);
        assert_eq!(data.used, 0.0);
        assert!(data.transactions.is_empty());
        assert_eq!(data.custom_categories.len(), 6);
        assert_eq!(data.custom_categories[0].category, "Food");
        assert_eq!(data.custom_categories[0].remaining, 100.0);
    }

    #[test]
    fn test_register_duplicate_user_fails() {
        let (_dir, mut store) = test_store();
        assert!(store.register_user("u1", "x@example.com", "X", 10.0).is_err());
    }

    #[test]
    fn test_unknown_user() {
        let (_dir, store) = test_store();
        let err = store.financial_data("nobody").unwrap_err();
        assert!(matches!(err, BuddyError::UnknownUser(_)));
    }

    #[test]
    fn test_add_expense_charges_category_case_insensitively() {
        let (_dir, mut store) = test_store();
        let stored = store.add_expense("u1", txn("t1", 30.0, "food")).unwrap();
        assert_eq!(stored.icon.as_deref(), Some("restaurant"));
        let food = category_named(&store, "Food");
        assert_eq!(food.spent, 30.0);
        assert_eq!(food.remaining, 70.0);
        assert_eq!(store.financial_data("u1").unwrap().used, 30.0);
        assert_balanced(&store);
    }

    #[test]
    fn test_negative_or_infinite_expense_is_rejected() {
        let (_dir, mut store) = test_store();
        for amount in [-50.0, f64::INFINITY, f64::NAN] {
            let err = store.add_expense("u1", txn("t1", amount, "Food")).unwrap_err();
            assert!(matches!(err, BuddyError::InvalidRecord(_)), "{amount}: {err}");
        }
        let food = category_named(&store, "Food");
        assert_eq!(food.spent, 0.0);
        assert_eq!(food.remaining, 100.0);
        assert!(store.transactions("u1").unwrap().is_empty());
    }

    #[test]
    fn test_update_to_negative_amount_keeps_old_state() {
        let (_dir, mut store) = test_store();
        store.add_expense("u1", txn("t1", 40.0, "Food")).unwrap();
        let mut bad = txn("t1", -40.0, "Food");
        assert!(matches!(
            store.update_transaction("u1", &bad),
            Err(BuddyError::InvalidRecord(_))
        ));
        bad.amount = f64::INFINITY;
        assert!(store.update_transaction("u1", &bad).is_err());

        assert_eq!(store.transaction("u1", "t1").unwrap().amount, 40.0);
        assert_eq!(category_named(&store, "Food").spent, 40.0);
        assert_balanced(&store);
    }

    #[test]
    fn test_income_does_not_touch_categories() {
        let (_dir, mut store) = test_store();
        let mut income = txn("t1", 500.0, "Food");
        income.is_expense = false;
        store.add_expense("u1", income).unwrap();
        assert_eq!(category_named(&store, "Food").spent, 0.0);
        assert_eq!(store.financial_data("u1").unwrap().used, 0.0);
    }

    #[test]
    fn test_expense_in_unknown_category_is_stored() {
        let (_dir, mut store) = test_store();
        let stored = store.add_expense("u1", txn("t1", 12.0, "Pets")).unwrap();
        assert!(stored.icon.is_none());
        assert_eq!(store.transactions("u1").unwrap().len(), 1);
        assert_balanced(&store);
    }

    #[test]
    fn test_update_transaction_moves_amount() {
        let (_dir, mut store) = test_store();
        store.add_expense("u1", txn("t1", 40.0, "Food")).unwrap();
        let mut changed = txn("t1", 25.0, "Transport");
        changed.icon = Some("car".to_string());
        store.update_transaction("u1", &changed).unwrap();

        assert_eq!(category_named(&store, "Food").spent, 0.0);
        let transport = category_named(&store, "Transport");
        assert_eq!(transport.spent, 25.0);
        assert_eq!(transport.remaining, 75.0);
        assert_eq!(store.transaction("u1", "t1").unwrap().amount, 25.0);
        assert_balanced(&store);
    }

    #[test]
    fn test_delete_transaction_restores_remaining() {
        let (_dir, mut store) = test_store();
        store.add_expense("u1", txn("t1", 40.0, "Health")).unwrap();
        let removed = store.delete_transaction("u1", "t1").unwrap();
        assert_eq!(removed.amount, 40.0);
        let health = category_named(&store, "Health");
        assert_eq!(health.spent, 0.0);
        assert_eq!(health.remaining, 100.0);
        assert!(matches!(
            store.delete_transaction("u1", "t1").unwrap_err(),
            BuddyError::UnknownTransaction(_)
        ));
    }

    #[test]
    fn test_category_crud_keeps_remaining_consistent() {
        let (_dir, store) = test_store();
        let pets = CustomCategory {
            id: "7".to_string(),
            category: "Pets".to_string(),
            allocated: 80.0,
            spent: 10.0,
            remaining: 0.0,
            period: "monthly".to_string(),
            color: "#000000".to_string(),
            icon: "paw".to_string(),
        };
        store.add_category("u1", &pets).unwrap();
        assert_eq!(store.category("u1", "7").unwrap().remaining, 70.0);

        let mut bigger = pets.clone();
        bigger.allocated = 200.0;
        store.update_category("u1", &bigger).unwrap();
        assert_eq!(store.category("u1", "7").unwrap().remaining, 190.0);
        assert_eq!(store.custom_categories("u1").unwrap().last().unwrap().id, "7");

        store.delete_category("u1", "7").unwrap();
        assert!(matches!(
            store.category("u1", "7").unwrap_err(),
            BuddyError::UnknownCategory(_)
        ));
        assert_balanced(&store);
    }

    #[test]
    fn test_all_transactions_pools_users() {
        let (_dir, mut store) = test_store();
        store.register_user("u2", "bo@example.com", "Bo", 500.0).unwrap();
        store.add_expense("u1", txn("a", 1.0, "Food")).unwrap();
        store.add_expense("u2", txn("b", 2.0, "Food")).unwrap();
        assert_eq!(store.all_transactions().unwrap().len(), 2);
        assert_eq!(store.transactions("u2").unwrap().len(), 1);
    }
}
