use crate::api::engine_status::{EngineStatus, LedgerStatus, ModelStatus, SimulatorStatus};
use crate::constants::APP_VERSION;
use crate::logic::ledger::ContentionSnapshot;
use crate::logic::simulator::Simulator;
use crate::logic::transaction::{TransactionError, TransactionService};

/// Snapshot of model, simulator and ledger state
pub fn collect(
    service: &TransactionService,
    simulator: &Simulator,
    contention: Option<ContentionSnapshot>,
) -> Result<EngineStatus, TransactionError> {
    let metadata = service.model_metadata();

    let m_status = ModelStatus {
        engine: metadata
            .as_ref()
            .map(|m| m.model_type.clone())
            .unwrap_or_else(|| "custom".to_string()),
        loaded: true,
        trees: metadata.as_ref().map(|m| m.trees),
        loaded_at: metadata.as_ref().map(|m| m.loaded_at),
    };

    let s_status = SimulatorStatus {
        running: simulator.is_running(),
        interval_ms: simulator.config().interval.as_millis() as u64,
        stats: simulator.stats(),
    };

    let l_status = LedgerStatus {
        summary: service.summary()?,
        contention,
    };

    Ok(EngineStatus {
        app_version: APP_VERSION.to_string(),
        model: m_status,
        simulator: s_status,
        ledger: l_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::logic::ledger::SqliteLedger;
    use crate::logic::model::tests::fixture_scorer;
    use crate::logic::simulator::SimulatorConfig;

    #[test]
    fn test_collect_reports_all_parts() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SqliteLedger::open(&dir.path().join("ledger.db")).unwrap());
        let service = Arc::new(TransactionService::new(
            Arc::new(fixture_scorer()),
            ledger.clone(),
        ));
        let simulator = Simulator::new(Arc::clone(&service), SimulatorConfig::default());

        service.classify_and_record(1_200_000.0, 2.0).unwrap();

        let status = collect(&service, &simulator, Some(ledger.contention_snapshot())).unwrap();

        assert_eq!(status.model.engine, "isolation_forest");
        assert_eq!(status.model.trees, Some(3));
        assert!(!status.simulator.running);
        assert_eq!(status.simulator.interval_ms, 3_000);
        assert_eq!(status.ledger.summary.total, 1);
        assert_eq!(status.ledger.contention, Some(ContentionSnapshot::default()));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["ledger"]["summary"]["fraud_count"], 1);
    }
}
