//! Schema setup for the `transactions` table
//!
//! Checks the live schema before changing it, so running it on every start
//! is harmless. Older stores were created without the `status` column; it is
//! added with its default the first time such a store is opened.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::error::LedgerError;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    amount REAL NOT NULL,
    time REAL NOT NULL,
    prediction TEXT NOT NULL,
    risk_score REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    created_at TEXT NOT NULL
);
"#;

const ADD_STATUS_COLUMN_SQL: &str =
    "ALTER TABLE transactions ADD COLUMN status TEXT NOT NULL DEFAULT 'ACTIVE'";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at, id)";

/// What a migration run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created_table: bool,
    pub added_status_column: bool,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        !self.created_table && !self.added_status_column
    }
}

/// Bring the schema up to date inside one immediate transaction
pub fn migrate(conn: &mut Connection) -> Result<MigrationReport, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut report = MigrationReport::default();

    if !table_exists(&tx, "transactions")? {
        tx.execute_batch(CREATE_TABLE_SQL)?;
        report.created_table = true;
        log::info!("Created transactions table");
    }

    if !column_exists(&tx, "transactions", "status")? {
        tx.execute_batch(ADD_STATUS_COLUMN_SQL)?;
        report.added_status_column = true;
        log::info!("Added status column to transactions table");
    }

    tx.execute_batch(CREATE_INDEX_SQL)?;
    tx.commit()?;

    Ok(report)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, LedgerError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, LedgerError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}
