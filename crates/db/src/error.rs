use jobrelay_core::types::JobId;

/// Errors raised by a [`JobStore`](crate::JobStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the given job id.
    #[error("Job {0} not found")]
    NotFound(JobId),

    /// A record already exists for the given job id.
    #[error("Job {0} already exists")]
    AlreadyExists(JobId),

    /// A stored row violates the job record invariants.
    #[error("Job {job_id} is corrupt: {reason}")]
    Corrupt { job_id: JobId, reason: String },

    /// The underlying database call failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only database-level failures qualify; a missing or duplicate record
    /// will not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_are_transient() {
        let id = uuid::Uuid::new_v4();
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!StoreError::NotFound(id).is_transient());
        assert!(!StoreError::AlreadyExists(id).is_transient());
        assert!(!StoreError::Corrupt {
            job_id: id,
            reason: "bad".into()
        }
        .is_transient());
    }
}
