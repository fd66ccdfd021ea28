//! Trigger queue consumer.
//!
//! A single long-lived Tokio task that receives triggers and runs each job in
//! its own task. A semaphore caps how many jobs execute at once; further
//! triggers wait in the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::coordinator::{Coordinator, RunOutcome};
use super::trigger::TriggerReceiver;

pub struct JobRunner {
    coordinator: Arc<Coordinator>,
    receiver: TriggerReceiver,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl JobRunner {
    pub fn new(
        coordinator: Arc<Coordinator>,
        receiver: TriggerReceiver,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            coordinator,
            receiver,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
            tracker: TaskTracker::new(),
        }
    }

    /// Run until `cancel` fires or every trigger sender is dropped, then wait
    /// up to `drain_timeout` for in-flight jobs.
    ///
    /// Triggers still queued at cancellation are not started; their jobs stay
    /// `PENDING` for the reconciler.
    pub async fn run(mut self, cancel: CancellationToken, drain_timeout: Duration) {
        tracing::info!(
            max_concurrent_jobs = self.permits.available_permits(),
            "Job runner started",
        );

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let trigger = tokio::select! {
                _ = cancel.cancelled() => break,
                trigger = self.receiver.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => break,
                },
            };

            let coordinator = Arc::clone(&self.coordinator);
            self.tracker.spawn(async move {
                let _permit = permit;
                let job_id = trigger.job_id;

                match coordinator.run(trigger).await {
                    Ok(RunOutcome::Completed | RunOutcome::Failed) => {}
                    Ok(outcome) => {
                        tracing::debug!(%job_id, ?outcome, "Job run ended without a write");
                    }
                    Err(e) => {
                        tracing::error!(%job_id, error = %e, "Job coordination failed");
                    }
                }
            });
        }

        self.receiver.close();
        self.tracker.close();

        let in_flight = self.tracker.len();
        tracing::info!(in_flight, "Job runner stopping; draining in-flight jobs");

        if tokio::time::timeout(drain_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Drain timeout elapsed; abandoning in-flight jobs",
            );
        }

        tracing::info!("Job runner stopped");
    }
}
