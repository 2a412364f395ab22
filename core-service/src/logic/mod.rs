//! Logic Module - Scoring, Ledger & Simulation
//!
//! - `model/` - Isolation forest scoring from fitted artifacts
//! - `ledger/` - SQLite transaction ledger
//! - `transaction` - Classify-and-record service
//! - `simulator` - Background synthetic traffic

pub mod config;
pub mod ledger;
pub mod model;
pub mod simulator;
pub mod status;
pub mod transaction;
