//! Traffic Simulator - Background Synthetic Transactions
//!
//! A worker thread that fabricates a transaction every `interval` and writes
//! it through the same `TransactionService` as foreground callers.
//!
//! The start/stop decision and the worker handle sit behind one mutex, so
//! two concurrent `start` calls cannot launch two loops and a `stop` racing a
//! `start` cannot leave a loop without an owner. The worker waits on its stop
//! channel between cycles, so cancellation is seen within one interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::transaction::TransactionService;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Pause between generated transactions
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// How long `stop` waits for the worker to exit
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(4);

/// Share of generated traffic drawn from the fraud-like profile
pub const FRAUD_PROFILE_PROBABILITY: f64 = 0.2;

const FRAUD_AMOUNT_RANGE: (f64, f64) = (100_000.0, 1_500_000.0);
const FRAUD_HOUR_RANGE: (f64, f64) = (0.0, 5.0);
const NORMAL_AMOUNT_RANGE: (f64, f64) = (500.0, 60_000.0);
const NORMAL_HOUR_RANGE: (f64, f64) = (8.0, 20.0);

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub interval: Duration,
    pub stop_timeout: Duration,
    pub fraud_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            fraud_probability: FRAUD_PROFILE_PROBABILITY,
        }
    }
}

/// One fabricated transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticTransaction {
    pub amount: f64,
    pub hour: f64,
    pub fraud_profile: bool,
}

/// Counters for the status view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorStats {
    /// Transactions successfully recorded
    pub generated: u64,
    /// Cycles whose write failed
    pub failed: u64,
    /// Cycles that drew the fraud-like profile
    pub fraud_profile: u64,
}

#[derive(Debug, Default)]
struct Counters {
    generated: AtomicU64,
    failed: AtomicU64,
    fraud_profile: AtomicU64,
}

struct Worker {
    stop_tx: Sender<()>,
    /// Disconnects when the worker thread exits
    exited_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[derive(Default)]
struct Control {
    worker: Option<Worker>,
    /// Worker that missed the stop deadline and is still finishing its cycle
    draining: Option<JoinHandle<()>>,
}

pub struct Simulator {
    service: Arc<TransactionService>,
    config: SimulatorConfig,
    control: Mutex<Control>,
    counters: Arc<Counters>,
}

// ============================================================================
// SIMULATOR CONTROL
// ============================================================================

impl Simulator {
    pub fn new(service: Arc<TransactionService>, config: SimulatorConfig) -> Self {
        Self {
            service,
            config,
            control: Mutex::new(Control::default()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Launch the worker. `false` if it is already running, or if a stopped
    /// worker has not exited yet.
    pub fn start(&self) -> bool {
        let mut control = self.control.lock();

        if control.worker.as_ref().map(Worker::is_alive).unwrap_or(false) {
            return false;
        }
        if let Some(handle) = control.draining.take() {
            if !handle.is_finished() {
                log::warn!("Simulator still finishing a previous run, not starting");
                control.draining = Some(handle);
                return false;
            }
            let _ = handle.join();
        }
        // reap a worker that exited on its own
        if let Some(old) = control.worker.take() {
            let _ = old.handle.join();
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let (exited_tx, exited_rx) = mpsc::channel::<()>();
        let service = Arc::clone(&self.service);
        let counters = Arc::clone(&self.counters);
        let config = self.config.clone();

        let spawned = thread::Builder::new()
            .name("finguard-simulator".to_string())
            .spawn(move || {
                let _exited = exited_tx;
                run_loop(&service, &counters, &config, &stop_rx);
            });

        match spawned {
            Ok(handle) => {
                control.worker = Some(Worker { stop_tx, exited_rx, handle });
                log::info!("Simulator started (interval: {:?})", self.config.interval);
                true
            }
            Err(e) => {
                log::error!("Failed to spawn simulator thread: {}", e);
                false
            }
        }
    }

    /// Signal the worker and wait (bounded) for it to exit. `false` if it was
    /// not running.
    pub fn stop(&self) -> bool {
        let mut control = self.control.lock();

        let Some(worker) = control.worker.take() else {
            return false;
        };
        if !worker.is_alive() {
            let _ = worker.handle.join();
            return false;
        }

        let _ = worker.stop_tx.send(());

        match worker.exited_rx.recv_timeout(self.config.stop_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                // the stop signal is queued; the loop exits after its current cycle
                log::warn!(
                    "Simulator did not exit within {:?}, leaving it to drain",
                    self.config.stop_timeout
                );
                control.draining = Some(worker.handle);
            }
            _ => {
                if worker.handle.join().is_err() {
                    log::error!("Simulator worker panicked");
                }
            }
        }

        log::info!("Simulator stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.control.lock().worker.as_ref().map(Worker::is_alive).unwrap_or(false)
    }

    pub fn stats(&self) -> SimulatorStats {
        SimulatorStats {
            generated: self.counters.generated.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            fraud_profile: self.counters.fraud_profile.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// WORK LOOP
// ============================================================================

fn run_loop(
    service: &TransactionService,
    counters: &Counters,
    config: &SimulatorConfig,
    stop_rx: &Receiver<()>,
) {
    let mut rng = StdRng::from_entropy();
    log::info!("Simulator loop started");

    loop {
        match stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            _ => break,
        }

        let txn = synthesize(&mut rng, config.fraud_probability);
        if txn.fraud_profile {
            counters.fraud_profile.fetch_add(1, Ordering::Relaxed);
        }

        match service.classify_and_record(txn.amount, txn.hour) {
            Ok(record) => {
                counters.generated.fetch_add(1, Ordering::Relaxed);
                log::debug!("Simulated transaction #{} -> {}", record.id, record.prediction);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Simulated transaction failed: {}", e);
            }
        }

        match stop_rx.recv_timeout(config.interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            _ => break,
        }
    }

    log::info!("Simulator loop stopped");
}

/// Draw one transaction from the fraud-like or the benign profile
pub fn synthesize<R: Rng>(rng: &mut R, fraud_probability: f64) -> SyntheticTransaction {
    let fraud_profile = rng.gen_bool(fraud_probability.clamp(0.0, 1.0));

    let (amount_range, hour_range) = if fraud_profile {
        (FRAUD_AMOUNT_RANGE, FRAUD_HOUR_RANGE)
    } else {
        (NORMAL_AMOUNT_RANGE, NORMAL_HOUR_RANGE)
    };

    let amount = rng.gen_range(amount_range.0..amount_range.1);
    let hour = rng.gen_range(hour_range.0..hour_range.1);

    SyntheticTransaction {
        amount: round2(amount),
        hour: round2(hour),
        fraud_profile,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Instant;

    use std::sync::atomic::AtomicUsize;

    use crate::logic::ledger::SqliteLedger;
    use crate::logic::model::tests::fixture_scorer;
    use crate::logic::model::{Label, RiskModel, ScoredResult};
    use tempfile::TempDir;

    fn fast_config() -> SimulatorConfig {
        SimulatorConfig {
            interval: Duration::from_millis(20),
            stop_timeout: Duration::from_secs(4),
            fraud_probability: FRAUD_PROFILE_PROBABILITY,
        }
    }

    fn setup(config: SimulatorConfig) -> (TempDir, Arc<TransactionService>, Simulator) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::open(&dir.path().join("ledger.db")).unwrap();
        let service = Arc::new(TransactionService::new(
            Arc::new(fixture_scorer()),
            Arc::new(ledger),
        ));
        let simulator = Simulator::new(Arc::clone(&service), config);
        (dir, service, simulator)
    }

    fn wait_for_records(service: &TransactionService, at_least: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while service.list_history().unwrap().len() < at_least {
            assert!(Instant::now() < deadline, "simulator produced too few records");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_lifecycle_flags() {
        let (_dir, _service, simulator) = setup(fast_config());

        assert!(!simulator.is_running());
        assert!(simulator.start());
        assert!(!simulator.start());
        assert!(simulator.is_running());

        assert!(simulator.stop());
        assert!(!simulator.is_running());
        assert!(!simulator.stop());
    }

    #[test]
    fn test_stop_when_never_started() {
        let (_dir, _service, simulator) = setup(fast_config());
        assert!(!simulator.stop());
    }

    #[test]
    fn test_writes_while_running_and_not_after_stop() {
        let (_dir, service, simulator) = setup(fast_config());

        simulator.start();
        wait_for_records(&service, 3);
        assert!(simulator.stop());

        let count_at_stop = service.list_history().unwrap().len();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(service.list_history().unwrap().len(), count_at_stop);

        let stats = simulator.stats();
        assert_eq!(stats.generated as usize, count_at_stop);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let (_dir, service, simulator) = setup(fast_config());

        assert!(simulator.start());
        wait_for_records(&service, 1);
        assert!(simulator.stop());

        let before = service.list_history().unwrap().len();
        assert!(simulator.start());
        wait_for_records(&service, before + 1);
        assert!(simulator.stop());
    }

    #[test]
    fn test_stop_is_prompt_with_long_interval() {
        let config = SimulatorConfig {
            interval: Duration::from_secs(30),
            ..fast_config()
        };
        let (_dir, service, simulator) = setup(config);

        simulator.start();
        wait_for_records(&service, 1);

        let started = Instant::now();
        assert!(simulator.stop());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_concurrent_start_launches_one_worker() {
        let (_dir, _service, simulator) = setup(fast_config());
        let simulator = Arc::new(simulator);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let simulator = Arc::clone(&simulator);
                thread::spawn(move || simulator.start())
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(started, 1);
        assert!(simulator.stop());
    }

    #[test]
    fn test_start_stop_race_leaves_consistent_state() {
        let (_dir, _service, simulator) = setup(fast_config());
        let simulator = Arc::new(simulator);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let simulator = Arc::clone(&simulator);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        simulator.start();
                    } else {
                        simulator.stop();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        simulator.stop();
        assert!(!simulator.is_running());
    }

    #[test]
    fn test_interleaves_with_foreground_writes() {
        let (_dir, service, simulator) = setup(fast_config());
        simulator.start();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let service = Arc::clone(&service);
                thread::spawn(move || service.classify_and_record(40.0 + i as f64, 13.0).unwrap())
            })
            .collect();
        let foreground: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        wait_for_records(&service, 22);
        simulator.stop();

        let history = service.list_history().unwrap();
        let ids: HashSet<i64> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), history.len());
        for record in &foreground {
            assert!(history.contains(record));
        }
        assert_eq!(history.len(), 20 + simulator.stats().generated as usize);
    }

    /// Scores slowly and records how many scoring calls overlap
    #[derive(Default)]
    struct SlowModel {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RiskModel for SlowModel {
        fn score(&self, _amount: f64, _hour: f64) -> ScoredResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(600));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ScoredResult { label: Label::Normal, risk_score: 0.1 }
        }
    }

    fn wait_until_drained(simulator: &Simulator) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let drained = simulator
                .control
                .lock()
                .draining
                .as_ref()
                .map(|h| h.is_finished())
                .unwrap_or(true);
            if drained {
                return;
            }
            assert!(Instant::now() < deadline, "simulator worker never exited");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_stop_timeout_blocks_restart_until_worker_exits() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::open(&dir.path().join("ledger.db")).unwrap();
        let model = Arc::new(SlowModel::default());
        let service = Arc::new(TransactionService::new(model.clone(), Arc::new(ledger)));
        let config = SimulatorConfig {
            interval: Duration::from_millis(20),
            stop_timeout: Duration::from_millis(50),
            fraud_probability: FRAUD_PROFILE_PROBABILITY,
        };
        let simulator = Simulator::new(Arc::clone(&service), config);

        assert!(simulator.start());
        thread::sleep(Duration::from_millis(100));

        let stopping = Instant::now();
        assert!(simulator.stop());
        assert!(stopping.elapsed() < Duration::from_millis(400));
        assert!(!simulator.is_running());

        // the old loop is still mid-cycle
        assert!(!simulator.start());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !simulator.start() {
            assert!(Instant::now() < deadline, "simulator never restarted");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(simulator.is_running());

        simulator.stop();
        wait_until_drained(&simulator);

        assert_eq!(model.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(service.list_history().unwrap().len() >= 2);
    }

    #[test]
    fn test_synthesize_fraud_profile_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let txn = synthesize(&mut rng, 1.0);
            assert!(txn.fraud_profile);
            assert!(txn.amount >= 100_000.0 && txn.amount <= 1_500_000.0);
            assert!(txn.hour >= 0.0 && txn.hour <= 5.0);
        }
    }

    #[test]
    fn test_synthesize_normal_profile_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let txn = synthesize(&mut rng, 0.0);
            assert!(!txn.fraud_profile);
            assert!(txn.amount >= 500.0 && txn.amount <= 60_000.0);
            assert!(txn.hour >= 8.0 && txn.hour <= 20.0);
        }
    }

    #[test]
    fn test_synthesize_rounds_to_cents() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let txn = synthesize(&mut rng, FRAUD_PROFILE_PROBABILITY);
            assert_eq!(txn.amount, round2(txn.amount));
            assert_eq!(txn.hour, round2(txn.hour));
        }
    }

    #[test]
    fn test_synthesize_profile_mix() {
        let mut rng = StdRng::seed_from_u64(42);
        let fraud = (0..5_000)
            .filter(|_| synthesize(&mut rng, FRAUD_PROFILE_PROBABILITY).fraud_profile)
            .count();

        // 20% of 5000, with generous slack
        assert!((800..1_200).contains(&fraud), "fraud-profile draws: {}", fraud);
    }
}
