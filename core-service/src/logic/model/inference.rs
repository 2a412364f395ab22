//! Inference Engine - Isolation Forest Scoring
//!
//! `Scorer` is built once at startup from fitted artifacts and never mutated
//! afterwards, so it can be shared across threads without locking.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::forest::IsolationForest;
use super::scaler::StandardScaler;
use super::FEATURE_COUNT;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Binary classification of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Fraud,
    Normal,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fraud => "FRAUD",
            Label::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FRAUD" => Ok(Label::Fraud),
            "NORMAL" => Ok(Label::Normal),
            other => Err(format!("unknown prediction label '{}'", other)),
        }
    }
}

/// Scoring output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(rename = "prediction")]
    pub label: Label,
    /// Negated anomaly score, 4 decimals. Higher = more fraud-like. Unbounded.
    pub risk_score: f64,
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_dir: String,
    pub model_type: String,
    pub trees: usize,
    pub max_samples: usize,
    pub offset: f64,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid model parameters: {0}")]
    Invalid(String),
}

// ============================================================================
// RISK MODEL TRAIT
// ============================================================================

/// Anything that can classify a transaction. Implementations must be pure.
pub trait RiskModel: Send + Sync {
    fn score(&self, amount: f64, hour: f64) -> ScoredResult;

    fn metadata(&self) -> Option<ModelMetadata> {
        None
    }
}

// ============================================================================
// ISOLATION FOREST SCORER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Scorer {
    scaler: StandardScaler,
    forest: IsolationForest,
    metadata: ModelMetadata,
}

impl Scorer {
    /// Build a scorer from already-parsed parameters
    pub fn new(
        scaler: StandardScaler,
        forest: IsolationForest,
        model_dir: impl Into<String>,
    ) -> Result<Self, ModelError> {
        scaler.validate()?;
        forest.validate()?;

        let metadata = ModelMetadata {
            model_dir: model_dir.into(),
            model_type: "isolation_forest".to_string(),
            trees: forest.trees.len(),
            max_samples: forest.max_samples,
            offset: forest.offset,
            loaded_at: Utc::now(),
        };

        Ok(Self { scaler, forest, metadata })
    }

    pub fn score_features(&self, features: &[f64; FEATURE_COUNT]) -> ScoredResult {
        let scaled = self.scaler.transform(features);
        let raw = self.forest.score_samples(&scaled);

        let label = if self.forest.decision_function(raw) < 0.0 {
            Label::Fraud
        } else {
            Label::Normal
        };

        ScoredResult {
            label,
            risk_score: round4(-raw),
        }
    }
}

impl RiskModel for Scorer {
    fn score(&self, amount: f64, hour: f64) -> ScoredResult {
        self.score_features(&[amount, hour])
    }

    fn metadata(&self) -> Option<ModelMetadata> {
        Some(self.metadata.clone())
    }
}

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
