use std::path::Path;

use rusqlite::Connection;

use crate::error::{ClerkError, Result};

pub const DB_FILE: &str = "clerk.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY,
    business_name TEXT NOT NULL,
    contact_name TEXT,
    email TEXT,
    phone TEXT,
    website TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    payment_status TEXT NOT NULL DEFAULT 'overdue',
    stripe_environment TEXT NOT NULL DEFAULT 'test',
    stripe_customer_id TEXT,
    stripe_payment_intent_ids TEXT NOT NULL DEFAULT '[]',
    stripe_subscription_ids TEXT NOT NULL DEFAULT '[]',
    total_paid REAL NOT NULL DEFAULT 0,
    subscription_monthly_value REAL NOT NULL DEFAULT 0,
    subscription_status TEXT,
    last_payment_date TEXT,
    notes TEXT NOT NULL DEFAULT '[]',
    sync_errors TEXT,
    last_synced_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clients_customer ON clients(stripe_customer_id);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY,
    client_id INTEGER,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    expense_date TEXT NOT NULL,
    is_recurring INTEGER NOT NULL DEFAULT 0,
    is_paused INTEGER NOT NULL DEFAULT 0,
    recurring_frequency TEXT,
    total_occurrences INTEGER,
    next_due_date TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_expenses_client ON expenses(client_id);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open the database inside the configured data directory.
pub fn open_default() -> Result<Connection> {
    let path = crate::settings::get_data_dir().join(DB_FILE);
    if !path.exists() {
        return Err(ClerkError::Other(
            "Database not found. Run `clerk init` to set up.".to_string(),
        ));
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
