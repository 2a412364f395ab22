//! Write retry for SQLite contention
//!
//! Other processes may hold the database lock past `busy_timeout`. Those
//! writes are retried a bounded number of times; anything else, or a
//! contention error on the last attempt, goes back to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

pub const WRITE_MAX_RETRIES: usize = 3;
pub const WRITE_RETRY_BACKOFF_MS: [u64; WRITE_MAX_RETRIES] = [100, 300, 700];

#[derive(Debug, Default)]
pub struct ContentionCounters {
    write_retry_total: AtomicU64,
    busy_error_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentionSnapshot {
    pub write_retry_total: u64,
    pub busy_error_total: u64,
}

impl ContentionCounters {
    pub fn snapshot(&self) -> ContentionSnapshot {
        ContentionSnapshot {
            write_retry_total: self.write_retry_total.load(Ordering::Relaxed),
            busy_error_total: self.busy_error_total.load(Ordering::Relaxed),
        }
    }
}

/// Runs `operation`, retrying busy/locked failures with backoff
pub fn with_write_retry<T, F>(counters: &ContentionCounters, mut operation: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Result<T, LedgerError>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_retryable() {
                    return Err(error);
                }
                counters.busy_error_total.fetch_add(1, Ordering::Relaxed);

                if attempt >= WRITE_MAX_RETRIES {
                    log::error!("Ledger write failed after {} retries: {}", attempt, error);
                    return Err(error);
                }

                counters.write_retry_total.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Ledger busy, retrying write in {}ms (attempt {}/{})",
                    WRITE_RETRY_BACKOFF_MS[attempt],
                    attempt + 1,
                    WRITE_MAX_RETRIES
                );
                std::thread::sleep(Duration::from_millis(WRITE_RETRY_BACKOFF_MS[attempt]));
                attempt += 1;
            }
        }
    }
}

fn is_retryable_sqlite_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("database is locked")
        || lowered.contains("database is busy")
        || lowered.contains("database table is locked")
}

pub fn is_retryable_sqlite_error(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(code, message) => {
            matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
                || message
                    .as_deref()
                    .map(is_retryable_sqlite_message)
                    .unwrap_or(false)
        }
        _ => false,
    }
}
