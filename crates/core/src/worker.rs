//! The worker boundary and the job type registry.
//!
//! A [`Worker`] performs the domain work behind a job type (querying market
//! data, searching a help center, ...). The coordinator treats it as opaque:
//! JSON input in, JSON result or [`WorkerError`] out. The [`WorkerRegistry`]
//! maps the job type named in `POST /initiate/{jobType}` to the worker bound
//! to it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::JobId;

/// Maximum length of a job type name.
const MAX_JOB_TYPE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Identity of the job a worker is executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: JobId,
    pub job_type: String,
}

/// Any failure raised while a worker executes a job.
///
/// The coordinator stores the `Display` form of this error on the failed job.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The input was well-formed JSON but unusable by this worker.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A call to an external service failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The worker did not finish within the configured limit.
    #[error("Worker timed out after {0:?}")]
    TimedOut(Duration),

    /// The worker task panicked.
    #[error("Worker panicked: {0}")]
    Panicked(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

/// The domain-specific executor bound to a job type.
///
/// Implementations may run for minutes and may fail for any reason; they must
/// not assume anything about the job's stored status.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    async fn execute(&self, ctx: &JobContext, input: Value) -> Result<Value, WorkerError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Static mapping from job type to the worker that executes it.
///
/// Built once at start-up and shared behind an `Arc`.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: BTreeMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `worker` to `job_type`.
    ///
    /// Fails if the name is invalid or already bound.
    pub fn register(
        &mut self,
        job_type: impl Into<String>,
        worker: Arc<dyn Worker>,
    ) -> Result<(), CoreError> {
        let job_type = job_type.into();
        validate_job_type(&job_type)?;

        if self.workers.contains_key(&job_type) {
            return Err(CoreError::Validation(format!(
                "Job type '{job_type}' is already registered"
            )));
        }

        self.workers.insert(job_type, worker);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_worker(
        mut self,
        job_type: impl Into<String>,
        worker: Arc<dyn Worker>,
    ) -> Result<Self, CoreError> {
        self.register(job_type, worker)?;
        Ok(self)
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.workers.contains_key(job_type)
    }

    /// Look up the worker bound to `job_type`.
    pub fn resolve(&self, job_type: &str) -> Result<Arc<dyn Worker>, CoreError> {
        self.workers
            .get(job_type)
            .cloned()
            .ok_or_else(|| CoreError::UnknownJobType(job_type.to_string()))
    }

    /// Registered job types, in sorted order.
    pub fn job_types(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Validate a job type name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_JOB_TYPE_LEN` characters.
/// - Must contain only lowercase ASCII letters, digits, hyphen, or underscore.
pub fn validate_job_type(job_type: &str) -> Result<(), CoreError> {
    if job_type.is_empty() {
        return Err(CoreError::Validation("Job type must not be empty".into()));
    }
    if job_type.len() > MAX_JOB_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "Job type must not exceed {MAX_JOB_TYPE_LEN} characters"
        )));
    }
    if !job_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "Job type '{job_type}' may only contain lowercase letters, digits, '-' or '_'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
