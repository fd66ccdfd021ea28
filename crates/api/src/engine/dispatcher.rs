//! Job submission.
//!
//! Validates the job type and input, persists a `PENDING` record, then
//! enqueues a trigger without waiting for execution. The dispatcher never
//! observes how the job ends.

use std::sync::Arc;

use jobrelay_core::error::CoreError;
use jobrelay_core::job::validate_input;
use jobrelay_core::types::JobId;
use jobrelay_core::worker::WorkerRegistry;
use jobrelay_db::{JobStore, NewJob, StoreError};
use serde_json::Value;

use super::trigger::{JobTrigger, TriggerError, TriggerSender};

/// Why a submission failed.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Unknown job type or invalid input. Nothing was persisted.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The `PENDING` record could not be written. Nothing was triggered.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The record exists but the trigger was not enqueued; the job stays
    /// `PENDING` until the reconciler re-triggers it.
    #[error("Job {job_id} was stored but could not be queued: {source}")]
    Trigger {
        job_id: JobId,
        #[source]
        source: TriggerError,
    },
}

pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    registry: Arc<WorkerRegistry>,
    triggers: TriggerSender,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<WorkerRegistry>,
        triggers: TriggerSender,
    ) -> Self {
        Self {
            store,
            registry,
            triggers,
        }
    }

    /// Submit a job and return its id as soon as it is queued.
    pub async fn submit(&self, job_type: &str, input: Value) -> Result<JobId, DispatchError> {
        if !self.registry.contains(job_type) {
            return Err(CoreError::UnknownJobType(job_type.to_string()).into());
        }
        validate_input(&input)?;

        let job_id = uuid::Uuid::new_v4();
        self.store
            .create(NewJob {
                id: job_id,
                job_type: job_type.to_string(),
                input: input.clone(),
            })
            .await?;

        tracing::info!(%job_id, job_type, "Job created");

        self.triggers
            .try_send(JobTrigger {
                job_id,
                job_type: job_type.to_string(),
                input,
            })
            .map_err(|source| {
                tracing::error!(%job_id, error = %source, "Failed to queue job trigger");
                DispatchError::Trigger { job_id, source }
            })?;

        Ok(job_id)
    }
}
