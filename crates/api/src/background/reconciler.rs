//! Re-triggering of stale `PENDING` jobs.
//!
//! A job can be stored but never executed: the trigger queue was full or
//! closed at submission, or the process stopped before the runner reached
//! it. On a fixed interval this task lists `PENDING` jobs older than the
//! configured threshold and enqueues them again. Jobs whose trigger is
//! still waiting in the queue are skipped, so slow runners do not fill the
//! queue with duplicates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobrelay_db::{JobStore, StoreError};
use tokio_util::sync::CancellationToken;

use crate::engine::trigger::{JobTrigger, TriggerError, TriggerSender};

/// Maximum jobs re-triggered per sweep.
const SWEEP_LIMIT: i64 = 100;

/// Sweeps for jobs stuck in `PENDING`.
pub struct Reconciler {
    store: Arc<dyn JobStore>,
    triggers: TriggerSender,
    interval: Duration,
    stale_after: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn JobStore>,
        triggers: TriggerSender,
        interval: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            store,
            triggers,
            interval,
            stale_after,
        }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.as_secs(),
            "Pending job reconciler started",
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Pending job reconciler stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(0) => tracing::debug!("Reconciler: no stale pending jobs"),
                        Ok(requeued) => {
                            tracing::info!(requeued, "Reconciler: re-triggered stale pending jobs");
                        }
                        Err(e) => tracing::error!(error = %e, "Reconciler: sweep failed"),
                    }
                }
            }
        }
    }

    /// One sweep. Returns how many triggers were enqueued.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(stale_after)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let stale = self.store.list_stale_pending(cutoff, SWEEP_LIMIT).await?;

        let mut requeued = 0;
        for job in stale {
            let job_id = job.id;
            match self.triggers.try_send(JobTrigger {
                job_id,
                job_type: job.job_type,
                input: job.input,
            }) {
                Ok(()) => requeued += 1,
                Err(TriggerError::AlreadyQueued) => {
                    tracing::debug!(%job_id, "Reconciler: job already queued");
                }
                Err(TriggerError::Full) => {
                    tracing::warn!(%job_id, "Reconciler: trigger queue full; retrying next sweep");
                    break;
                }
                Err(TriggerError::Closed) => {
                    tracing::warn!("Reconciler: trigger queue closed");
                    break;
                }
            }
        }

        Ok(requeued)
    }
}
