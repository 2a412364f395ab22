//! Ledger Module - Persistent Transaction Records
//!
//! The ledger owns record storage and id assignment. Records are append-only
//! except for `status`, which only ever moves ACTIVE -> BLOCKED.

pub mod types;
pub mod error;
pub mod migrate;
pub mod retry;
pub mod sqlite;


pub use error::LedgerError;
pub use migrate::{migrate, MigrationReport};
pub use retry::ContentionSnapshot;
pub use sqlite::SqliteLedger;
pub use types::{LedgerSummary, TransactionRecord, TransactionStatus};

use crate::logic::model::Label;

/// Storage seam for the transaction service.
///
/// Implementations must make each write atomic and serialize conflicting
/// writes themselves; callers do no locking.
pub trait LedgerStore: Send + Sync {
    /// Persist a new ACTIVE record, assigning its id and `created_at`
    fn insert(
        &self,
        amount: f64,
        time: f64,
        prediction: Label,
        risk_score: f64,
    ) -> Result<TransactionRecord, LedgerError>;

    /// All records, newest first (ties: higher id first)
    fn list_all(&self) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// The `limit` newest records
    fn list_recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, LedgerError>;

    fn get(&self, id: i64) -> Result<Option<TransactionRecord>, LedgerError>;

    /// `Ok(None)` when no record has this id
    fn update_status(
        &self,
        id: i64,
        status: TransactionStatus,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    fn summary(&self) -> Result<LedgerSummary, LedgerError>;
}
