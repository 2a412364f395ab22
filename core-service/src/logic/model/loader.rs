//! Artifact Loader
//!
//! Reads `scaler.json` and `forest.json` from the model directory, optionally
//! pinning each file to a SHA-256 digest. Every failure here is fatal for
//! startup.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::forest::IsolationForest;
use super::inference::{ModelError, RiskModel, Scorer};
use super::scaler::StandardScaler;

pub const SCALER_FILE: &str = "scaler.json";
pub const FOREST_FILE: &str = "forest.json";

/// Expected hex digests for the artifacts. `None` skips the check.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPins {
    pub scaler_sha256: Option<String>,
    pub forest_sha256: Option<String>,
}

/// Load and validate the scorer from `model_dir`
pub fn load_scorer(model_dir: &Path, pins: &ArtifactPins) -> Result<Scorer, ModelError> {
    log::info!("Loading risk model from: {}", model_dir.display());

    let scaler: StandardScaler =
        read_artifact(&model_dir.join(SCALER_FILE), pins.scaler_sha256.as_deref())?;
    let forest: IsolationForest =
        read_artifact(&model_dir.join(FOREST_FILE), pins.forest_sha256.as_deref())?;

    let scorer = Scorer::new(scaler, forest, model_dir.display().to_string())?;

    if let Some(meta) = scorer.metadata() {
        log::info!(
            "Risk model loaded ({} trees, max_samples={}, offset={:.4})",
            meta.trees,
            meta.max_samples,
            meta.offset
        );
    }

    Ok(scorer)
}

fn read_artifact<T: DeserializeOwned>(path: &Path, pin: Option<&str>) -> Result<T, ModelError> {
    let bytes = fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(expected) = pin {
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ModelError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
        log::debug!("Checksum verified for {}", path.display());
    }

    serde_json::from_slice(&bytes).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

