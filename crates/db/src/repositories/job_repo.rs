//! Repository for the `jobs` table.
//!
//! Every status write is conditional on the current `status_id`, so the
//! lifecycle state machine holds even with concurrent writers. Status
//! literals come from [`JobStatus`]; there are no magic numbers.

use async_trait::async_trait;
use jobrelay_core::job::{JobStatus, Transition, TransitionOutcome};
use jobrelay_core::types::{JobId, StatusId, Timestamp};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::job::{Job, JobRow};
use crate::store::{JobStore, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, status_id, input, result, error_message, \
    created_at, updated_at, started_at, completed_at";

/// Raw SQL operations on the `jobs` table.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job and return the stored row.
    pub async fn insert(pool: &PgPool, job: &NewJob) -> Result<JobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (id, job_type, status_id, input) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job.id)
            .bind(&job.job_type)
            .bind(JobStatus::Pending.id())
            .bind(&job.input)
            .fetch_one(pool)
            .await
    }

    /// `PENDING -> PROCESSING`, setting `started_at`.
    ///
    /// Returns `true` if the row was claimed.
    pub async fn mark_processing(pool: &PgPool, job_id: JobId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobStatus::Processing.id())
        .bind(JobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `PROCESSING -> COMPLETED` with the worker's result payload.
    pub async fn complete(
        pool: &PgPool,
        job_id: JobId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, result = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(result)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    /// `PROCESSING -> FAILED` with an error description.
    pub async fn fail(pool: &PgPool, job_id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current status ID of a job, if it exists.
    pub async fn status_of(pool: &PgPool, job_id: JobId) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>("SELECT status_id FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, job_id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Pending jobs created before `older_than`, oldest first.
    pub async fn list_pending_before(
        pool: &PgPool,
        older_than: Timestamp,
        limit: i64,
    ) -> Result<Vec<JobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 AND created_at < $2 \
             ORDER BY created_at ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(JobStatus::Pending.id())
            .bind(older_than)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

/// PostgreSQL-backed [`JobStore`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: NewJob) -> Result<Job, StoreError> {
        match JobRepo::insert(&self.pool, &job).await {
            Ok(row) => Job::try_from(row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AlreadyExists(job.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn transition(
        &self,
        job_id: JobId,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError> {
        let applied = match &transition {
            Transition::Start => JobRepo::mark_processing(&self.pool, job_id).await?,
            Transition::Complete(result) => JobRepo::complete(&self.pool, job_id, result).await?,
            Transition::Fail(error) => JobRepo::fail(&self.pool, job_id, error).await?,
        };

        if applied {
            return Ok(TransitionOutcome::Applied);
        }

        // Nothing matched: either the job is missing or in another status.
        let status_id = JobRepo::status_of(&self.pool, job_id)
            .await?
            .ok_or(StoreError::NotFound(job_id))?;
        let current = JobStatus::from_id(status_id).ok_or_else(|| StoreError::Corrupt {
            job_id,
            reason: format!("unknown status id {status_id}"),
        })?;

        tracing::debug!(
            %job_id,
            expected = %transition.expected_from(),
            %current,
            "Job transition rejected",
        );
        Ok(TransitionOutcome::Rejected { current })
    }

    async fn get(&self, job_id: JobId) -> Result<Job, StoreError> {
        let row = JobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(StoreError::NotFound(job_id))?;
        Job::try_from(row)
    }

    async fn list_stale_pending(
        &self,
        older_than: Timestamp,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError> {
        JobRepo::list_pending_before(&self.pool, older_than, limit)
            .await?
            .into_iter()
            .map(Job::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
