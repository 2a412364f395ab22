//! Risk Band Thresholds
//!
//! Buckets a risk score into LOW / MEDIUM / HIGH for display. The
//! FRAUD/NORMAL decision belongs to the forest offset, not to these bands.

use serde::{Deserialize, Serialize};

/// Band boundaries, on the raw risk score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandThresholds {
    /// Scores at or above this are MEDIUM
    pub medium_from: f64,

    /// Scores at or above this are HIGH
    pub high_from: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            medium_from: 0.40,
            high_from: 0.70,
        }
    }
}

impl BandThresholds {
    pub fn new(medium_from: f64, high_from: f64) -> Self {
        Self { medium_from, high_from }
    }

    pub fn classify(&self, risk_score: f64) -> RiskBand {
        if risk_score < self.medium_from {
            RiskBand::Low
        } else if risk_score < self.high_from {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Band under the default thresholds
    pub fn from_score(risk_score: f64) -> Self {
        BandThresholds::default().classify(risk_score)
    }
}

/// Risk score rendered as a percentage with two decimals, e.g. `80.60%`
pub fn format_risk_percentage(risk_score: f64) -> String {
    format!("{:.2}%", risk_score * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        assert_eq!(RiskBand::from_score(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_score(0.3999), RiskBand::Low);
        assert_eq!(RiskBand::from_score(0.40), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(0.6999), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(0.70), RiskBand::High);
        assert_eq!(RiskBand::from_score(3.2), RiskBand::High);
    }

    #[test]
    fn test_negative_scores_are_low() {
        assert_eq!(RiskBand::from_score(-0.25), RiskBand::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let bands = BandThresholds::new(0.5, 0.6);
        assert_eq!(bands.classify(0.45), RiskBand::Low);
        assert_eq!(bands.classify(0.55), RiskBand::Medium);
        assert_eq!(bands.classify(0.65), RiskBand::High);
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_risk_percentage(0.806), "80.60%");
        assert_eq!(format_risk_percentage(0.0), "0.00%");
    }
}
