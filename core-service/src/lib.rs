//! FinGuard core: transaction anomaly scoring backed by a SQLite ledger.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::config::Config;
pub use logic::ledger::{LedgerError, LedgerStore, SqliteLedger, TransactionRecord, TransactionStatus};
pub use logic::model::{load_scorer, Label, ModelError, RiskModel, ScoredResult, Scorer};
pub use logic::simulator::{Simulator, SimulatorConfig};
pub use logic::transaction::{TransactionError, TransactionService};
