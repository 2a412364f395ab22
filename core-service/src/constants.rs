//! Central Configuration Constants
//!
//! Single source of truth for configuration defaults and the environment
//! variables that override them.

use std::path::PathBuf;

/// App name
pub const APP_NAME: &str = "FinGuard";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory holding `scaler.json` and `forest.json`
pub const DEFAULT_MODEL_DIR: &str = "ml";

/// Ledger database file name under the data directory
pub const DEFAULT_DB_FILE: &str = "finguard.db";

/// Simulator pause between transactions (seconds)
pub const DEFAULT_SIMULATOR_INTERVAL_SECS: u64 = 3;

/// Simulator stop wait (seconds)
pub const DEFAULT_SIMULATOR_STOP_TIMEOUT_SECS: u64 = 4;

/// Ledger status log interval (seconds)
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 30;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Ledger path from environment or `<data_local_dir>/finguard/finguard.db`
pub fn get_db_path() -> PathBuf {
    std::env::var("FINGUARD_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("finguard")
                .join(DEFAULT_DB_FILE)
        })
}

/// Model artifact directory from environment or default
pub fn get_model_dir() -> PathBuf {
    std::env::var("FINGUARD_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR))
}

/// Optional pinned digest of the scaler artifact
pub fn get_scaler_sha256() -> Option<String> {
    non_empty_var("FINGUARD_SCALER_SHA256")
}

/// Optional pinned digest of the forest artifact
pub fn get_forest_sha256() -> Option<String> {
    non_empty_var("FINGUARD_FOREST_SHA256")
}

pub fn get_simulator_interval() -> u64 {
    parse_var("FINGUARD_SIMULATOR_INTERVAL_SECS").unwrap_or(DEFAULT_SIMULATOR_INTERVAL_SECS)
}

pub fn get_simulator_stop_timeout() -> u64 {
    parse_var("FINGUARD_SIMULATOR_STOP_TIMEOUT_SECS").unwrap_or(DEFAULT_SIMULATOR_STOP_TIMEOUT_SECS)
}

pub fn get_status_interval() -> u64 {
    parse_var("FINGUARD_STATUS_INTERVAL_SECS").unwrap_or(DEFAULT_STATUS_INTERVAL_SECS)
}

/// Whether the simulator starts with the process
pub fn is_simulator_autostart() -> bool {
    std::env::var("FINGUARD_SIMULATOR_AUTOSTART")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
