//! Per-job lifecycle coordinator.
//!
//! For one trigger the coordinator:
//!
//! 1. Claims the job with a conditional `PENDING -> PROCESSING` write. If the
//!    job is not `PENDING` (a duplicate trigger, or a reconciler re-trigger
//!    racing the original) it stops without invoking the worker.
//! 2. Runs the bound worker in a separate task, so a panic is caught rather
//!    than tearing down the caller, optionally bounded by a timeout.
//! 3. Records `COMPLETED` with the result verbatim, or `FAILED` with the
//!    error's description. This write is retried on transient store errors.
//!
//! A job whose terminal write ultimately fails stays `PROCESSING`; the error
//! is returned to the runner, which logs it.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use jobrelay_core::job::{JobStatus, Transition, TransitionOutcome};
use jobrelay_core::types::JobId;
use jobrelay_core::worker::{JobContext, WorkerError, WorkerRegistry};
use jobrelay_db::{JobStore, StoreError};
use serde_json::Value;

use super::trigger::JobTrigger;

/// Stored when a worker fails with an empty message.
const EMPTY_ERROR_FALLBACK: &str = "Worker failed without an error message";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Bounded retry for the terminal write.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled after each failure.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// How a coordinator run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The worker succeeded and the result was stored.
    Completed,
    /// The worker failed and the error was stored.
    Failed,
    /// The job was not `PENDING`, so another run owns (or owned) it.
    /// The worker was not invoked.
    AlreadyProcessing { current: JobStatus },
    /// The job left `PROCESSING` while the worker ran; the outcome was dropped.
    Superseded { current: JobStatus },
}

/// Store failures that prevent the coordinator from driving a job.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Failed to claim job {job_id}: {source}")]
    Claim {
        job_id: JobId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to record {status} for job {job_id}: {source}")]
    Record {
        job_id: JobId,
        status: JobStatus,
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator {
    store: Arc<dyn JobStore>,
    registry: Arc<WorkerRegistry>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl Coordinator {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<WorkerRegistry>) -> Self {
        Self {
            store,
            registry,
            timeout: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Bound worker execution; `None` lets workers run indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Drive one job from `PENDING` to a terminal state.
    pub async fn run(&self, trigger: JobTrigger) -> Result<RunOutcome, CoordinatorError> {
        let JobTrigger {
            job_id,
            job_type,
            input,
        } = trigger;

        let claim = self
            .store
            .transition(job_id, Transition::Start)
            .await
            .map_err(|source| CoordinatorError::Claim { job_id, source })?;

        if let TransitionOutcome::Rejected { current } = claim {
            tracing::info!(%job_id, %current, "Job not pending; skipping duplicate trigger");
            return Ok(RunOutcome::AlreadyProcessing { current });
        }

        tracing::info!(%job_id, job_type = %job_type, "Job processing");

        let ctx = JobContext { job_id, job_type };
        let transition = match self.invoke(ctx, input).await {
            Ok(result) => Transition::Complete(result),
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Job worker failed");
                Transition::Fail(describe(&e))
            }
        };
        let target = transition.target();

        match self.record(job_id, transition).await? {
            TransitionOutcome::Applied => {
                tracing::info!(%job_id, status = %target, "Job finished");
                Ok(match target {
                    JobStatus::Completed => RunOutcome::Completed,
                    _ => RunOutcome::Failed,
                })
            }
            TransitionOutcome::Rejected { current } => {
                tracing::warn!(
                    %job_id,
                    %current,
                    dropped = %target,
                    "Job left PROCESSING while its worker ran; outcome dropped",
                );
                Ok(RunOutcome::Superseded { current })
            }
        }
    }

    /// Resolve and execute the worker in its own task.
    async fn invoke(&self, ctx: JobContext, input: Value) -> Result<Value, WorkerError> {
        let worker = self
            .registry
            .resolve(&ctx.job_type)
            .map_err(|e| WorkerError::Failed(e.to_string()))?;

        let handle = tokio::spawn(async move { worker.execute(&ctx, input).await });
        let abort = handle.abort_handle();

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(WorkerError::TimedOut(limit));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(WorkerError::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(WorkerError::Failed("Worker task was cancelled".into())),
        }
    }

    /// Apply the terminal transition, retrying transient store errors.
    async fn record(
        &self,
        job_id: JobId,
        transition: Transition,
    ) -> Result<TransitionOutcome, CoordinatorError> {
        let status = transition.target();
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.store.transition(job_id, transition.clone()).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        %job_id,
                        %status,
                        attempt,
                        error = %e,
                        "Terminal write failed; retrying",
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(CoordinatorError::Record {
                        job_id,
                        status,
                        source,
                    })
                }
            }
        }
    }
}

/// Non-empty description of a worker failure.
fn describe(error: &WorkerError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        EMPTY_ERROR_FALLBACK.to_string()
    } else {
        message
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
