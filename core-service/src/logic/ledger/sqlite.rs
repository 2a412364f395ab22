//! SQLite-backed ledger
//!
//! One write connection behind a mutex serializes writers in this process;
//! `BEGIN IMMEDIATE` plus `busy_timeout` and retry handle writers in other
//! processes. A second connection serves reads from WAL snapshots, so reads
//! never see a half-written row and do not queue behind writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::error::LedgerError;
use super::migrate::{migrate, MigrationReport};
use super::retry::{with_write_retry, ContentionCounters, ContentionSnapshot};
use super::types::{
    format_timestamp, parse_timestamp, LedgerSummary, TransactionRecord, TransactionStatus,
};
use super::LedgerStore;
use crate::logic::model::Label;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT id, amount, time, prediction, risk_score, status, created_at FROM transactions";

/// Row as stored, before the text columns are checked
struct RawRow {
    id: i64,
    amount: f64,
    time: f64,
    prediction: String,
    risk_score: f64,
    status: Option<String>,
    created_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            amount: row.get(1)?,
            time: row.get(2)?,
            prediction: row.get(3)?,
            risk_score: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<TransactionRecord, LedgerError> {
        let corrupt = |reason: String| LedgerError::CorruptRecord { id: self.id, reason };

        let prediction: Label = self.prediction.parse().map_err(corrupt)?;
        // NULL only appears in rows written by older schemas; the column default applies
        let status = match self.status.as_deref() {
            None => TransactionStatus::Active,
            Some(raw) => raw.parse().map_err(corrupt)?,
        };
        let created_at = parse_timestamp(&self.created_at)
            .map_err(|e| corrupt(format!("bad created_at '{}': {}", self.created_at, e)))?;

        Ok(TransactionRecord {
            id: self.id,
            amount: self.amount,
            time: self.time,
            prediction,
            risk_score: self.risk_score,
            status,
            created_at,
        })
    }
}

pub struct SqliteLedger {
    path: PathBuf,
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    contention: ContentionCounters,
    migration: MigrationReport,
}

impl SqliteLedger {
    /// Open (or create) the ledger at `path` and bring its schema up to date
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contention = ContentionCounters::default();
        let mut writer = open_connection(path)?;
        let migration = with_write_retry(&contention, || migrate(&mut writer))?;
        let reader = open_connection(path)?;

        log::info!("Ledger opened at {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            contention,
            migration,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema changes applied when this handle was opened
    pub fn migration_report(&self) -> MigrationReport {
        self.migration
    }

    pub fn contention_snapshot(&self) -> ContentionSnapshot {
        self.contention.snapshot()
    }
}

fn open_connection(path: &Path) -> Result<Connection, LedgerError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

fn read_record(conn: &Connection, id: i64) -> Result<Option<TransactionRecord>, LedgerError> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    let raw = conn
        .query_row(&sql, params![id], RawRow::from_row)
        .optional()?;

    raw.map(RawRow::into_record).transpose()
}

fn read_many(conn: &Connection, limit: Option<usize>) -> Result<Vec<TransactionRecord>, LedgerError> {
    let mut sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], RawRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(RawRow::into_record).collect()
}

impl LedgerStore for SqliteLedger {
    fn insert(
        &self,
        amount: f64,
        time: f64,
        prediction: Label,
        risk_score: f64,
    ) -> Result<TransactionRecord, LedgerError> {
        let mut conn = self.writer.lock();

        let record = with_write_retry(&self.contention, || {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // created_at never goes backwards relative to id, even if the wall clock does
            let now = Utc::now().trunc_subsecs(6);
            let latest: Option<String> = tx
                .query_row(
                    "SELECT created_at FROM transactions ORDER BY id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            let created_at = match latest.as_deref().map(parse_timestamp) {
                Some(Ok(prev)) if prev > now => prev,
                _ => now,
            };

            tx.execute(
                "INSERT INTO transactions (amount, time, prediction, risk_score, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    amount,
                    time,
                    prediction.as_str(),
                    risk_score,
                    TransactionStatus::Active.as_str(),
                    format_timestamp(&created_at),
                ],
            )?;
            let id = tx.last_insert_rowid();

            let record = read_record(&tx, id)?.ok_or_else(|| LedgerError::CorruptRecord {
                id,
                reason: "row missing after insert".to_string(),
            })?;

            tx.commit()?;
            Ok(record)
        })?;

        log::debug!(
            "Ledger insert id={} prediction={} risk={:.4}",
            record.id,
            record.prediction,
            record.risk_score
        );

        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        let conn = self.reader.lock();
        read_many(&conn, None)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, LedgerError> {
        let conn = self.reader.lock();
        read_many(&conn, Some(limit))
    }

    fn get(&self, id: i64) -> Result<Option<TransactionRecord>, LedgerError> {
        let conn = self.reader.lock();
        read_record(&conn, id)
    }

    fn update_status(
        &self,
        id: i64,
        status: TransactionStatus,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let mut conn = self.writer.lock();

        with_write_retry(&self.contention, || {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(current) = read_record(&tx, id)? else {
                return Ok(None);
            };

            if !current.status.can_transition_to(status) {
                return Err(LedgerError::IllegalTransition {
                    id,
                    from: current.status,
                    to: status,
                });
            }

            if current.status != status {
                tx.execute(
                    "UPDATE transactions SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )?;
                log::info!("Transaction {} status {} -> {}", id, current.status, status);
            }

            tx.commit()?;
            Ok(Some(TransactionRecord { status, ..current }))
        })
    }

    fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let mut conn = self.reader.lock();
        // both reads come from the same snapshot
        let tx = conn.transaction()?;

        let (total, fraud, blocked): (i64, Option<i64>, Option<i64>) = tx.query_row(
            "SELECT COUNT(*),
                    SUM(CASE WHEN prediction = 'FRAUD' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN status = 'BLOCKED' THEN 1 ELSE 0 END)
             FROM transactions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let latest_risk: Option<f64> = tx
            .query_row(
                "SELECT risk_score FROM transactions ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        tx.commit()?;

        Ok(LedgerSummary::new(
            total.max(0) as u64,
            fraud.unwrap_or(0).max(0) as u64,
            blocked.unwrap_or(0).max(0) as u64,
            latest_risk,
        ))
    }
}
