use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::SchedulerState;

use crate::service::TradingCore;

#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: SchedulerState,
    /// Bumped on every start so a loop from an earlier run knows to exit.
    generation: u64,
    /// Cycles that have started and not yet finished.
    in_flight: usize,
}

/// Drives `TradingCore::run_cycle` on a fixed interval.
///
/// Cloneable handles are not needed: share it behind an `Arc`.
pub struct Scheduler {
    core: Arc<TradingCore>,
    status: Arc<RwLock<Status>>,
    wake: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
    cycles_tx: watch::Sender<u64>,
}

impl Scheduler {
    pub fn new(core: Arc<TradingCore>) -> Self {
        let (cycles_tx, _) = watch::channel(0);
        Self {
            core,
            status: Arc::new(RwLock::new(Status::default())),
            wake: Arc::new(Notify::new()),
            task: Mutex::new(None),
            cycles_tx,
        }
    }

    pub async fn state(&self) -> SchedulerState {
        self.status.read().await.state
    }

    /// Whether a cycle is running right now.
    pub async fn cycle_in_progress(&self) -> bool {
        self.status.read().await.in_flight > 0
    }

    /// Completed-cycle counter. Changes once per finished cycle.
    pub fn subscribe_cycles(&self) -> watch::Receiver<u64> {
        self.cycles_tx.subscribe()
    }

    /// Start cycling every `interval`. The first cycle runs immediately.
    ///
    /// Returns `false` if already running; no second loop is started.
    pub async fn start(&self, interval: Duration) -> bool {
        let generation = {
            let mut status = self.status.write().await;
            if status.state == SchedulerState::Running {
                info!("Scheduler already running");
                return false;
            }
            status.state = SchedulerState::Running;
            status.generation += 1;
            status.generation
        };

        info!(interval_ms = interval.as_millis() as u64, generation, "Scheduler started");
        let handle = tokio::spawn(run_loop(
            self.core.clone(),
            self.status.clone(),
            self.wake.clone(),
            self.cycles_tx.clone(),
            generation,
            interval,
        ));
        // A loop from an earlier run exits on its own; cycles never overlap
        // because the core serialises them.
        *self.task.lock().await = Some(handle);
        true
    }

    /// Stop cycling. Once this returns no new cycle will start; a cycle
    /// already in flight runs to completion.
    ///
    /// Returns `false` if already stopped.
    pub async fn stop(&self) -> bool {
        {
            let mut status = self.status.write().await;
            if status.state == SchedulerState::Stopped {
                return false;
            }
            status.state = SchedulerState::Stopped;
        }
        self.wake.notify_one();
        info!("Scheduler stopped");
        true
    }

    /// `stop`, then wait for the loop task (and any in-flight cycle) to finish.
    pub async fn stop_and_wait(&self) {
        self.stop().await;
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler loop ended abnormally");
            }
        }
    }
}

async fn run_loop(
    core: Arc<TradingCore>,
    status: Arc<RwLock<Status>>,
    wake: Arc<Notify>,
    cycles_tx: watch::Sender<u64>,
    generation: u64,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let woken = tokio::select! {
            _ = ticker.tick() => false,
            _ = wake.notified() => true,
        };

        {
            let mut s = status.write().await;
            if s.state != SchedulerState::Running || s.generation != generation {
                break;
            }
            // Stale wake-up from an earlier stop; wait for the next tick.
            if woken {
                continue;
            }
            s.in_flight += 1;
        }

        // Own task so a panicking handler or action fails this cycle only.
        let cycle = tokio::spawn({
            let core = core.clone();
            async move { core.run_cycle().await }
        });
        match cycle.await {
            Ok(report) => {
                if report.refresh_error.is_some() || !report.failures.is_empty() {
                    warn!(
                        refresh_failed = report.refresh_error.is_some(),
                        failures = report.failures.len(),
                        "Cycle finished with failures"
                    );
                }
            }
            Err(e) if e.is_panic() => error!(generation, "Cycle panicked, scheduler continues"),
            Err(e) => error!(generation, error = %e, "Cycle task cancelled"),
        }

        status.write().await.in_flight -= 1;
        cycles_tx.send_modify(|n| *n += 1);
    }

    info!(generation, "Scheduler loop exited");
}
