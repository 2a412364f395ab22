//! API Module
//!
//! Serializable shapes handed to whatever transport fronts the engine.
//!
//! - `engine_status.rs`: model, simulator and ledger snapshot

pub mod engine_status;

pub use engine_status::*;
