use super::types::TransactionStatus;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare ledger directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt ledger record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    #[error("transaction {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: i64,
        from: TransactionStatus,
        to: TransactionStatus,
    },
}

impl LedgerError {
    /// Busy/locked contention that may succeed if retried
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Sqlite(error) => super::retry::is_retryable_sqlite_error(error),
            _ => false,
        }
    }
}
