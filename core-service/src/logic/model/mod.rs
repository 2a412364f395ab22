//! Model Module - Transaction Risk Scoring
//!
//! Evaluates a pre-fitted isolation forest over the two transaction
//! features (amount, hour-of-day). Fitting happens offline; this module only
//! loads the serialized parameters and scores.

pub mod scaler;
pub mod forest;
pub mod inference;
pub mod loader;
pub mod threshold;


/// Feature layout: [amount, hour]
pub const FEATURE_COUNT: usize = 2;

// Re-export common types
pub use inference::{Label, ModelError, ModelMetadata, RiskModel, ScoredResult, Scorer};
pub use loader::{load_scorer, ArtifactPins};
pub use threshold::{BandThresholds, RiskBand};
