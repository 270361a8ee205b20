//! Sync scheduler
//!
//! A ticker task enqueues one [`SyncJob`] per cadence interval on a bounded
//! channel; a single worker task drains it. The first tick fires one full
//! cadence after start, not immediately. The worker is the only executor,
//! so at most one sync attempt is in flight at a time. A tick that arrives
//! while an attempt is still running waits in the channel (deferred, not
//! dropped, not run in parallel). When the channel is full the ticker itself
//! blocks on the send, so a long outage cannot pile up unbounded ticks.
//!
//! Attempt errors are logged and swallowed; the next tick is the retry
//! mechanism. There is no in-attempt backoff.
//!
//! The single-concurrency guarantee is per process. Running several engine
//! processes against the same paranet needs coordination this module does
//! not provide.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::source::AssetSource;
use crate::store::AssetStore;
use crate::sync::SyncEngine;

/// One queued sync attempt.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub scheduled_at: DateTime<Utc>,
}

/// Recurring-sync scheduler with an explicit start/stop lifecycle.
pub struct SyncScheduler<S, L> {
    engine: SyncEngine<S, L>,
    cadence: Duration,
    queue_depth: usize,
}

/// Handle to a running scheduler. Dropping it does not stop the tasks;
/// call [`SchedulerHandle::shutdown`].
pub struct SchedulerHandle {
    cancel: CancellationToken,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Cancellation token shared by the ticker and worker tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the ticker and worker and wait for both to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.ticker.await;
        let _ = self.worker.await;
    }
}

impl<S, L> SyncScheduler<S, L>
where
    S: AssetSource + 'static,
    L: AssetStore + 'static,
{
    pub fn new(engine: SyncEngine<S, L>, cadence: Duration, queue_depth: usize) -> Self {
        Self {
            engine,
            cadence,
            queue_depth,
        }
    }

    /// Spawn the ticker and worker tasks and return their handle.
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<SyncJob>(self.queue_depth);

        let ticker_cancel = cancel.clone();
        let cadence = self.cadence;
        let ticker = tokio::spawn(async move {
            // interval() would fire its first tick immediately; start one
            // cadence out so attempts run on the cadence from the beginning.
            let mut interval = interval_at(Instant::now() + cadence, cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        debug!("Queueing sync job");
                        let job = SyncJob { scheduled_at: Utc::now() };
                        tokio::select! {
                            _ = ticker_cancel.cancelled() => break,
                            sent = tx.send(job) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            debug!("Sync ticker stopped");
        });

        let worker_cancel = cancel.clone();
        let engine = self.engine;
        let worker = tokio::spawn(async move {
            info!("Sync worker started");
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    job = rx.recv() => {
                        let Some(job) = job else { break };
                        match engine.run_attempt().await {
                            Ok(outcome) => {
                                info!(
                                    outcome = ?outcome,
                                    scheduled_at = %job.scheduled_at,
                                    "Sync attempt finished"
                                );
                            },
                            Err(e) => {
                                // Swallowed: the attempt is lost for this
                                // tick, the next tick retries from the
                                // unchanged watermark.
                                error!(error = %e, "Sync attempt failed");
                            },
                        }
                    }
                }
            }
            info!("Sync worker stopped");
        });

        SchedulerHandle {
            cancel,
            ticker,
            worker,
        }
    }
}
