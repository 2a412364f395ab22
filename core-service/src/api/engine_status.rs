use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::ledger::{ContentionSnapshot, LedgerSummary};
use crate::logic::simulator::SimulatorStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub app_version: String,
    pub model: ModelStatus,
    pub simulator: SimulatorStatus,
    pub ledger: LedgerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub engine: String, // "isolation_forest" | "custom"
    pub loaded: bool,
    pub trees: Option<usize>,
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub stats: SimulatorStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub summary: LedgerSummary,
    pub contention: Option<ContentionSnapshot>,
}
