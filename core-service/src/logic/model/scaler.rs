//! Standard Scaler
//!
//! Per-feature `(x - mean) / scale` using parameters fitted offline.

use serde::{Deserialize, Serialize};

use super::inference::ModelError;
use super::FEATURE_COUNT;

/// Fitted standardization parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "scaler expects {} features, got mean={} scale={}",
                FEATURE_COUNT,
                self.mean.len(),
                self.scale.len()
            )));
        }

        let all_finite = self.mean.iter().chain(self.scale.iter()).all(|v| v.is_finite());
        if !all_finite {
            return Err(ModelError::Invalid("scaler parameters must be finite".to_string()));
        }

        if self.scale.iter().any(|s| *s < 0.0) {
            return Err(ModelError::Invalid("scaler scale must be non-negative".to_string()));
        }

        Ok(())
    }

    /// Standardize one feature vector
    pub fn transform(&self, features: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0f64; FEATURE_COUNT];

        for i in 0..FEATURE_COUNT {
            // zero variance features are left centred but unscaled
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            scaled[i] = (features[i] - self.mean[i]) / scale;
        }

        scaled
    }
}
