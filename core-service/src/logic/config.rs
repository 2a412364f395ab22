//! Configuration module

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::logic::model::ArtifactPins;
use crate::logic::simulator::{SimulatorConfig, FRAUD_PROFILE_PROBABILITY};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite ledger file
    pub db_path: PathBuf,

    /// Directory with the fitted model artifacts
    pub model_dir: PathBuf,

    /// Optional artifact digests
    pub pins: ArtifactPins,

    pub simulator_interval: Duration,
    pub simulator_stop_timeout: Duration,

    /// Start the simulator with the process
    pub simulator_autostart: bool,

    /// How often the binary logs a ledger summary
    pub status_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            db_path: constants::get_db_path(),
            model_dir: constants::get_model_dir(),
            pins: ArtifactPins {
                scaler_sha256: constants::get_scaler_sha256(),
                forest_sha256: constants::get_forest_sha256(),
            },
            simulator_interval: at_least_one_sec(constants::get_simulator_interval()),
            simulator_stop_timeout: Duration::from_secs(constants::get_simulator_stop_timeout()),
            simulator_autostart: constants::is_simulator_autostart(),
            status_interval: at_least_one_sec(constants::get_status_interval()),
        }
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            interval: self.simulator_interval,
            stop_timeout: self.simulator_stop_timeout,
            fraud_probability: FRAUD_PROFILE_PROBABILITY,
        }
    }
}

/// Zero would turn a periodic loop into a busy loop
fn at_least_one_sec(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}
