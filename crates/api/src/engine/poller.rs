//! Read-only job status view.

use std::sync::Arc;

use jobrelay_core::job::JobStatus;
use jobrelay_core::types::JobId;
use jobrelay_db::models::job::Job;
use jobrelay_db::{JobStore, StoreError};
use serde::Serialize;
use serde_json::Value;

/// Caller-facing state of a job.
///
/// `result` is always serialized (`null` until the job completes); `error`
/// appears only on failed jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub process_id: JobId,
    pub status: JobStatus,
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            process_id: job.id,
            status: job.status,
            result: job.result,
            error: job.error,
        }
    }
}

/// Reads job state straight from the store on every call; nothing is cached.
#[derive(Clone)]
pub struct Poller {
    store: Arc<dyn JobStore>,
}

impl Poller {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Current view of `job_id`, or [`StoreError::NotFound`].
    pub async fn query(&self, job_id: JobId) -> Result<JobView, StoreError> {
        self.store.get(job_id).await.map(JobView::from)
    }
}
