use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::model::{Label, RiskBand};

/// Storage format for `created_at`. Fixed width, so text order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Lifecycle status of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Active,
    Blocked,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::Blocked => "BLOCKED",
        }
    }

    /// ACTIVE -> BLOCKED only; staying put is always allowed
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Active, _) | (TransactionStatus::Blocked, TransactionStatus::Blocked)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(TransactionStatus::Active),
            "BLOCKED" => Ok(TransactionStatus::Blocked),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// A scored transaction as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub amount: f64,
    /// Hour of day, [0, 24)
    pub time: f64,
    pub prediction: Label,
    pub risk_score: f64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn is_fraud(&self) -> bool {
        self.prediction == Label::Fraud
    }

    pub fn is_blocked(&self) -> bool {
        self.status == TransactionStatus::Blocked
    }

    pub fn risk_band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score)
    }
}

/// Aggregate view of the ledger for dashboards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: u64,
    pub fraud_count: u64,
    pub normal_count: u64,
    pub blocked_count: u64,
    /// Share of FRAUD predictions, percent with one decimal
    pub fraud_rate_pct: f64,
    /// Risk score of the most recent record
    pub latest_risk_score: Option<f64>,
}

impl LedgerSummary {
    pub fn new(total: u64, fraud_count: u64, blocked_count: u64, latest_risk_score: Option<f64>) -> Self {
        let fraud_rate_pct = if total > 0 {
            ((fraud_count as f64 / total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total,
            fraud_count,
            normal_count: total.saturating_sub(fraud_count),
            blocked_count,
            fraud_rate_pct,
            latest_risk_score,
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses stored timestamps, including legacy rows without fractional
/// seconds or with a `T` separator
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
}
