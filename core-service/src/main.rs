//! FinGuard Core - Main Entry Point

use std::sync::Arc;

use anyhow::Context;

use finguard_core::constants::{APP_NAME, APP_VERSION};
use finguard_core::logic::status;
use finguard_core::{load_scorer, Config, Simulator, SqliteLedger, TransactionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let config = Config::from_env();

    let scorer = load_scorer(&config.model_dir, &config.pins)
        .with_context(|| format!("loading model artifacts from {}", config.model_dir.display()))?;

    let ledger = Arc::new(
        SqliteLedger::open(&config.db_path)
            .with_context(|| format!("opening ledger at {}", config.db_path.display()))?,
    );

    let service = Arc::new(TransactionService::new(Arc::new(scorer), ledger.clone()));
    let simulator = Simulator::new(Arc::clone(&service), config.simulator_config());

    if config.simulator_autostart {
        simulator.start();
    } else {
        log::info!("Simulator autostart disabled");
    }

    let mut ticker = tokio::time::interval(config.status_interval);
    ticker.tick().await;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Ctrl-C handler unavailable, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match status::collect(&service, &simulator, Some(ledger.contention_snapshot())) {
                    Ok(s) => log::info!(
                        "Ledger: {} total, {} fraud ({:.1}%), {} blocked | simulator running={} generated={}",
                        s.ledger.summary.total,
                        s.ledger.summary.fraud_count,
                        s.ledger.summary.fraud_rate_pct,
                        s.ledger.summary.blocked_count,
                        s.simulator.running,
                        s.simulator.stats.generated,
                    ),
                    Err(e) => log::warn!("Status collection failed: {}", e),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    log::info!("Shutting down...");
    tokio::task::spawn_blocking(move || simulator.stop())
        .await
        .context("stopping simulator")?;

    log::info!("{} stopped", APP_NAME);
    Ok(())
}
