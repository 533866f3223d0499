use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    budget REAL NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS custom_categories (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    category TEXT NOT NULL,
    allocated REAL NOT NULL DEFAULT 0,
    spent REAL NOT NULL DEFAULT 0,
    remaining REAL NOT NULL DEFAULT 0,
    period TEXT NOT NULL DEFAULT 'monthly',
    color TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    position INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, id),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    user_id TEXT NOT NULL,
    id TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    category TEXT NOT NULL,
    date TEXT NOT NULL,
    is_expense INTEGER NOT NULL DEFAULT 1,
    icon TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, id),
    FOREIGN KEY (user_id) REFERENCES users(id)
);
";

// (id, category, color, icon)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, &str)] = &[
    ("1", "Food", "#F97316", "restaurant"),
    ("2", "Transport", "#8B5CF6", "car"),
    ("3", "Entertainment", "#06B6D4", "film"),
    ("4", "Shopping", "#EC4899", "bag-handle"),
    ("5", "Housing", "#10B981", "home"),
    ("6", "Health", "#EF4444", "medkit"),
];

pub const DEFAULT_CATEGORY_ALLOCATION: f64 = 100.0;

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
