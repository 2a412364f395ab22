//! Transaction Service - Score then Persist
//!
//! The single write path into the ledger. Foreground callers and the
//! simulator both go through `classify_and_record`, so every stored record
//! carries a score computed from exactly the features that were stored.

use std::sync::Arc;

use crate::logic::ledger::{
    LedgerError, LedgerStore, LedgerSummary, TransactionRecord, TransactionStatus,
};
use crate::logic::model::{ModelMetadata, RiskModel, ScoredResult};

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("invalid transaction input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct TransactionService {
    model: Arc<dyn RiskModel>,
    ledger: Arc<dyn LedgerStore>,
}

impl TransactionService {
    pub fn new(model: Arc<dyn RiskModel>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { model, ledger }
    }

    /// Score the transaction and store it as a new ACTIVE record
    pub fn classify_and_record(&self, amount: f64, time: f64) -> Result<TransactionRecord, TransactionError> {
        validate_input(amount, time)?;

        let scored = self.model.score(amount, time);
        let record = self.ledger.insert(amount, time, scored.label, scored.risk_score)?;

        log::info!(
            "Recorded transaction #{} amount={:.2} hour={:.2} -> {} (risk {:.4}, {:?})",
            record.id,
            record.amount,
            record.time,
            record.prediction,
            record.risk_score,
            record.risk_band()
        );

        Ok(record)
    }

    /// Classification without persisting anything
    pub fn score_only(&self, amount: f64, time: f64) -> Result<ScoredResult, TransactionError> {
        validate_input(amount, time)?;
        Ok(self.model.score(amount, time))
    }

    pub fn list_history(&self) -> Result<Vec<TransactionRecord>, TransactionError> {
        Ok(self.ledger.list_all()?)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, TransactionError> {
        Ok(self.ledger.list_recent(limit)?)
    }

    pub fn get(&self, id: i64) -> Result<Option<TransactionRecord>, TransactionError> {
        Ok(self.ledger.get(id)?)
    }

    /// `Ok(None)` means no such transaction
    pub fn block(&self, id: i64) -> Result<Option<TransactionRecord>, TransactionError> {
        let updated = self.ledger.update_status(id, TransactionStatus::Blocked)?;
        if updated.is_none() {
            log::warn!("Block requested for unknown transaction {}", id);
        }
        Ok(updated)
    }

    pub fn summary(&self) -> Result<LedgerSummary, TransactionError> {
        Ok(self.ledger.summary()?)
    }

    pub fn model_metadata(&self) -> Option<ModelMetadata> {
        self.model.metadata()
    }
}

fn validate_input(amount: f64, time: f64) -> Result<(), TransactionError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(TransactionError::InvalidInput(format!(
            "amount must be a positive number, got {}",
            amount
        )));
    }
    if !time.is_finite() || !(0.0..24.0).contains(&time) {
        return Err(TransactionError::InvalidInput(format!(
            "time must be an hour in [0, 24), got {}",
            time
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    use crate::logic::ledger::SqliteLedger;
    use crate::logic::model::tests::fixture_scorer;
    use crate::logic::model::Label;
    use tempfile::TempDir;

    /// Flags anything above a fixed amount, for checking the service wiring
    struct AmountCutoff(f64);

    impl RiskModel for AmountCutoff {
        fn score(&self, amount: f64, _hour: f64) -> ScoredResult {
            if amount > self.0 {
                ScoredResult { label: Label::Fraud, risk_score: 0.9 }
            } else {
                ScoredResult { label: Label::Normal, risk_score: 0.1 }
            }
        }
    }

    fn service_with(model: Arc<dyn RiskModel>) -> (TempDir, TransactionService) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::open(&dir.path().join("ledger.db")).unwrap();
        (dir, TransactionService::new(model, Arc::new(ledger)))
    }

    fn fixture_service() -> (TempDir, TransactionService) {
        service_with(Arc::new(fixture_scorer()))
    }

    #[test]
    fn test_classify_and_record_round_trip() {
        let (_dir, service) = fixture_service();

        let record = service.classify_and_record(1_200_000.0, 2.0).unwrap();
        let history = service.list_history().unwrap();

        let matching: Vec<_> = history.iter().filter(|r| r.id == record.id).collect();
        assert_eq!(matching.len(), 1);
        let stored = matching[0];
        assert_eq!(stored.amount, 1_200_000.0);
        assert_eq!(stored.time, 2.0);
        assert_eq!(stored.prediction, record.prediction);
        assert_eq!(stored.risk_score, record.risk_score);
        assert_eq!(stored.status, TransactionStatus::Active);
    }

    #[test]
    fn test_stored_score_matches_model() {
        let (_dir, service) = fixture_service();
        let scorer = fixture_scorer();

        let record = service.classify_and_record(45.0, 14.0).unwrap();
        let expected = scorer.score(45.0, 14.0);

        assert_eq!(record.prediction, expected.label);
        assert_eq!(record.risk_score, expected.risk_score);
        assert_eq!(record.prediction, Label::Normal);
    }

    #[test]
    fn test_uses_injected_model() {
        let (_dir, service) = service_with(Arc::new(AmountCutoff(1_000.0)));

        let small = service.classify_and_record(999.0, 12.0).unwrap();
        let large = service.classify_and_record(1_001.0, 12.0).unwrap();

        assert_eq!(small.prediction, Label::Normal);
        assert_eq!(large.prediction, Label::Fraud);
        assert!(service.model_metadata().is_none());
    }

    #[test]
    fn test_history_newest_first() {
        let (_dir, service) = fixture_service();

        let a = service.classify_and_record(45.0, 14.0).unwrap();
        let b = service.classify_and_record(60.0, 15.0).unwrap();

        let history = service.list_history().unwrap();
        assert_eq!(history[0].id, b.id);
        assert_eq!(history[1].id, a.id);
    }

    #[test]
    fn test_block_twice() {
        let (_dir, service) = fixture_service();
        let record = service.classify_and_record(1_200_000.0, 2.0).unwrap();

        let first = service.block(record.id).unwrap().unwrap();
        let second = service.block(record.id).unwrap().unwrap();

        assert_eq!(first.status, TransactionStatus::Blocked);
        assert_eq!(second.status, TransactionStatus::Blocked);
    }

    #[test]
    fn test_block_unknown_is_not_found() {
        let (_dir, service) = fixture_service();
        let record = service.classify_and_record(45.0, 14.0).unwrap();

        assert!(service.block(999_999).unwrap().is_none());
        assert_eq!(service.get(record.id).unwrap().unwrap().status, TransactionStatus::Active);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let (_dir, service) = fixture_service();

        for (amount, time) in [
            (0.0, 12.0),
            (-5.0, 12.0),
            (f64::NAN, 12.0),
            (f64::INFINITY, 12.0),
            (10.0, -0.1),
            (10.0, 24.0),
            (10.0, f64::NAN),
        ] {
            let result = service.classify_and_record(amount, time);
            assert!(matches!(result, Err(TransactionError::InvalidInput(_))), "{} {}", amount, time);
        }

        assert!(service.list_history().unwrap().is_empty());
    }

    #[test]
    fn test_score_only_does_not_persist() {
        let (_dir, service) = fixture_service();

        let scored = service.score_only(1_200_000.0, 2.0).unwrap();

        assert_eq!(scored.label, Label::Fraud);
        assert!(service.list_history().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_classify_and_record() {
        let (_dir, service) = fixture_service();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    let amount = 10.0 + i as f64;
                    let hour = (i % 24) as f64;
                    service.classify_and_record(amount, hour).unwrap()
                })
            })
            .collect();

        let records: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: HashSet<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 50);

        let history = service.list_history().unwrap();
        assert_eq!(history.len(), 50);
        for record in &records {
            let stored = history.iter().find(|r| r.id == record.id).unwrap();
            assert_eq!(stored, record);
        }
    }

    #[test]
    fn test_summary_after_activity() {
        let (_dir, service) = fixture_service();
        let fraud = service.classify_and_record(1_200_000.0, 2.0).unwrap();
        service.classify_and_record(45.0, 14.0).unwrap();
        service.block(fraud.id).unwrap();

        let summary = service.summary().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.fraud_count, 1);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(summary.fraud_rate_pct, 50.0);
    }
}
