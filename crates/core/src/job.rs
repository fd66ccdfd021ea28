//! Job status, the lifecycle state machine, and submission validation.
//!
//! A job moves strictly along
//!
//! ```text
//! PENDING -> PROCESSING -> COMPLETED
//!                       \-> FAILED
//! ```
//!
//! and never leaves a terminal state. Every write to a job is expressed as a
//! [`Transition`], which names the status it expects the job to be in. Stores
//! apply a transition only when that expectation holds (compare-and-swap), so
//! the state machine is enforced at the point of the write rather than by
//! callers reading first.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::StatusId;

/// Maximum length of a submitted `question`, in characters.
pub const MAX_QUESTION_CHARS: usize = 16_000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
///
/// Discriminants match the seed rows of the `job_statuses` lookup table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Look up a status by its database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Wire name, as returned by the status endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// `COMPLETED` and `FAILED` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// A single write against a job record.
///
/// Each variant carries exactly the fields its target status requires, so a
/// completed job always has a result and a failed job always has an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Claim the job for execution: `PENDING -> PROCESSING`.
    Start,
    /// Store the worker's result verbatim: `PROCESSING -> COMPLETED`.
    Complete(Value),
    /// Store a description of the failure: `PROCESSING -> FAILED`.
    Fail(String),
}

impl Transition {
    /// Status the job ends up in once this transition is applied.
    pub fn target(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Processing,
            Transition::Complete(_) => JobStatus::Completed,
            Transition::Fail(_) => JobStatus::Failed,
        }
    }

    /// Status the job must currently be in for this transition to apply.
    pub fn expected_from(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Pending,
            Transition::Complete(_) | Transition::Fail(_) => JobStatus::Processing,
        }
    }
}

/// Result of a conditional transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The job was in the expected status and has been updated.
    Applied,
    /// The job was in another status; nothing was written.
    Rejected { current: JobStatus },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a submitted job input.
///
/// The input must be a JSON object carrying a non-empty string `question`.
/// Any other fields are passed through to the worker untouched.
pub fn validate_input(input: &Value) -> Result<(), CoreError> {
    let Some(object) = input.as_object() else {
        return Err(CoreError::Validation(
            "Request body must be a JSON object".into(),
        ));
    };

    match object.get("question") {
        None => Err(CoreError::Validation("question is required".into())),
        Some(Value::String(q)) if q.trim().is_empty() => {
            Err(CoreError::Validation("question must not be empty".into()))
        }
        Some(Value::String(q)) if q.chars().count() > MAX_QUESTION_CHARS => {
            Err(CoreError::Validation(format!(
                "question must not exceed {MAX_QUESTION_CHARS} characters"
            )))
        }
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(CoreError::Validation("question must be a string".into())),
    }
}

/// Extract the `question` field from a (validated) job input.
pub fn question(input: &Value) -> Option<&str> {
    input.get("question").and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
