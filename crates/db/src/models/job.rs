//! The job record and its raw database row.

use jobrelay_core::job::JobStatus;
use jobrelay_core::types::{JobId, StatusId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::StoreError;

/// A job record with its status decoded.
///
/// Invariant: `result` is `Some` iff `status` is `Completed`, and `error` is
/// `Some` iff `status` is `Failed`. Rows that break this are rejected as
/// [`StoreError::Corrupt`] when loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// A fresh `PENDING` record.
    pub fn pending(id: JobId, job_type: String, input: serde_json::Value, now: Timestamp) -> Self {
        Self {
            id,
            job_type,
            status: JobStatus::Pending,
            input,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Check the result/error invariant against the status.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        let corrupt = |reason: &str| StoreError::Corrupt {
            job_id: self.id,
            reason: reason.to_string(),
        };

        match (self.status, self.result.is_some(), self.error.is_some()) {
            (JobStatus::Completed, true, false) => Ok(()),
            (JobStatus::Completed, _, _) => Err(corrupt("completed job must have only a result")),
            (JobStatus::Failed, false, true) => Ok(()),
            (JobStatus::Failed, _, _) => Err(corrupt("failed job must have only an error")),
            (_, false, false) => Ok(()),
            (status, _, _) => Err(corrupt(&format!(
                "{status} job must have neither result nor error"
            ))),
        }
    }
}

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub job_type: String,
    pub status_id: StatusId,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_id(row.status_id).ok_or_else(|| StoreError::Corrupt {
            job_id: row.id,
            reason: format!("unknown status id {}", row.status_id),
        })?;

        let job = Job {
            id: row.id,
            job_type: row.job_type,
            status,
            input: row.input,
            result: row.result,
            error: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        };
        job.check_invariants()?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row(status_id: StatusId) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: uuid::Uuid::new_v4(),
            job_type: "research".into(),
            status_id,
            input: json!({"question": "q"}),
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn pending_row_converts() {
        let job = Job::try_from(row(1)).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn unknown_status_id_is_corrupt() {
        assert!(matches!(
            Job::try_from(row(9)),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn completed_row_requires_result() {
        assert!(Job::try_from(row(3)).is_err());

        let mut completed = row(3);
        completed.result = Some(json!({"answer": "ok"}));
        assert_eq!(Job::try_from(completed).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn failed_row_requires_only_error() {
        let mut failed = row(4);
        failed.error_message = Some("boom".into());
        assert!(Job::try_from(failed.clone()).is_ok());

        failed.result = Some(json!(1));
        assert!(Job::try_from(failed).is_err());
    }

    #[test]
    fn processing_row_with_result_is_corrupt() {
        let mut processing = row(2);
        processing.result = Some(json!("early"));
        assert!(Job::try_from(processing).is_err());
    }
}
