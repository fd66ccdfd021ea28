//! Fire-and-forget hand-off from the dispatcher to the runner.
//!
//! The queue tracks which job ids are waiting in it, so a job is never
//! queued twice. An id is released when the runner receives its trigger.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use jobrelay_core::types::JobId;
use tokio::sync::mpsc;

/// Message asking the runner to execute a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTrigger {
    pub job_id: JobId,
    pub job_type: String,
    pub input: serde_json::Value,
}

/// Why a trigger could not be enqueued.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Trigger queue is full")]
    Full,

    #[error("Trigger queue is closed")]
    Closed,

    #[error("Job is already queued")]
    AlreadyQueued,
}

/// Ids of jobs whose trigger sits in the queue.
type QueuedIds = Arc<Mutex<HashSet<JobId>>>;

fn lock(queued: &QueuedIds) -> MutexGuard<'_, HashSet<JobId>> {
    // The set holds plain ids, so a poisoned guard is still consistent.
    queued.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer half of the trigger queue. Cheap to clone.
#[derive(Clone)]
pub struct TriggerSender {
    inner: mpsc::Sender<JobTrigger>,
    queued: QueuedIds,
}

/// Consumer half of the trigger queue, owned by the runner.
pub struct TriggerReceiver {
    inner: mpsc::Receiver<JobTrigger>,
    queued: QueuedIds,
}

/// Create a bounded trigger queue.
pub fn trigger_channel(capacity: usize) -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let queued = QueuedIds::default();
    (
        TriggerSender {
            inner: tx,
            queued: Arc::clone(&queued),
        },
        TriggerReceiver { inner: rx, queued },
    )
}

impl TriggerSender {
    /// Enqueue without waiting.
    ///
    /// Fails with [`TriggerError::AlreadyQueued`] while an earlier trigger
    /// for the same job has not been received yet.
    pub fn try_send(&self, trigger: JobTrigger) -> Result<(), TriggerError> {
        let job_id = trigger.job_id;
        let mut queued = lock(&self.queued);
        if !queued.insert(job_id) {
            return Err(TriggerError::AlreadyQueued);
        }

        self.inner.try_send(trigger).map_err(|e| {
            queued.remove(&job_id);
            match e {
                mpsc::error::TrySendError::Full(_) => TriggerError::Full,
                mpsc::error::TrySendError::Closed(_) => TriggerError::Closed,
            }
        })
    }

    #[cfg(test)]
    fn is_queued(&self, job_id: JobId) -> bool {
        lock(&self.queued).contains(&job_id)
    }
}

impl TriggerReceiver {
    /// Next trigger, or `None` once every sender is gone and the queue is empty.
    pub async fn recv(&mut self) -> Option<JobTrigger> {
        let trigger = self.inner.recv().await?;
        lock(&self.queued).remove(&trigger.job_id);
        Some(trigger)
    }

    /// Stop accepting new triggers; already queued ones can still be received.
    pub fn close(&mut self) {
        self.inner.close();
    }
}
