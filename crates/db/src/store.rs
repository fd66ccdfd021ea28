use async_trait::async_trait;
use jobrelay_core::job::{Transition, TransitionOutcome};
use jobrelay_core::types::{JobId, Timestamp};

use crate::error::StoreError;
use crate::models::job::Job;

/// Fields supplied when a job is first persisted.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: JobId,
    pub job_type: String,
    pub input: serde_json::Value,
}

/// Key-value persistence for job records.
///
/// All mutation is single-key. Implementations must guarantee that a `get`
/// issued after a `transition` on the same key observes the new value.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Insert a `PENDING` record.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn create(&self, job: NewJob) -> Result<Job, StoreError>;

    /// Apply `transition` if the job is in the status it expects.
    ///
    /// Only the status, the field the transition carries (result or error)
    /// and the timestamps are written. Returns
    /// [`TransitionOutcome::Rejected`] with the current status when the job
    /// is elsewhere in its lifecycle, and [`StoreError::NotFound`] when it
    /// does not exist.
    async fn transition(
        &self,
        job_id: JobId,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Fetch the current record.
    async fn get(&self, job_id: JobId) -> Result<Job, StoreError>;

    /// `PENDING` jobs created before `older_than`, oldest first.
    async fn list_stale_pending(
        &self,
        older_than: Timestamp,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
