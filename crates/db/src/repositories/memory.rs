//! In-process [`JobStore`] backed by a `HashMap` behind a `tokio` lock.
//!
//! Used by the test suites and when the service runs with
//! `STORE_BACKEND=memory`. Records live as long as the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use jobrelay_core::job::{JobStatus, Transition, TransitionOutcome};
use jobrelay_core::types::{JobId, Timestamp};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::job::Job;
use crate::store::{JobStore, NewJob};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: NewJob) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }

        let record = Job::pending(job.id, job.job_type, job.input, Utc::now());
        jobs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn transition(
        &self,
        job_id: JobId,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;

        if job.status != transition.expected_from() {
            return Ok(TransitionOutcome::Rejected {
                current: job.status,
            });
        }

        let now = Utc::now();
        job.status = transition.target();
        job.updated_at = now;
        match transition {
            Transition::Start => job.started_at = Some(now),
            Transition::Complete(result) => {
                job.result = Some(result);
                job.completed_at = Some(now);
            }
            Transition::Fail(error) => {
                job.error = Some(error);
                job.completed_at = Some(now);
            }
        }

        Ok(TransitionOutcome::Applied)
    }

    async fn get(&self, job_id: JobId) -> Result<Job, StoreError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound(job_id))
    }

    async fn list_stale_pending(
        &self,
        older_than: Timestamp,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut stale: Vec<Job> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .filter(|job| job.created_at < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|job| job.created_at);
        stale.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(stale)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn new_job() -> NewJob {
        NewJob {
            id: uuid::Uuid::new_v4(),
            job_type: "research".into(),
            input: json!({"question": "latest news on ticker BMY"}),
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_pending_record() {
        let store = MemoryJobStore::new();
        let job = new_job();
        let created = store.create(job.clone()).await.unwrap();

        assert_eq!(created.status, JobStatus::Pending);
        assert_eq!(store.get(job.id).await.unwrap(), created);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryJobStore::new();
        let job = new_job();
        store.create(job.clone()).await.unwrap();

        assert_matches!(store.create(job.clone()).await, Err(StoreError::AlreadyExists(id)) if id == job.id);
    }

    #[tokio::test]
    async fn get_unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        let id = uuid::Uuid::new_v4();
        assert_matches!(store.get(id).await, Err(StoreError::NotFound(missing)) if missing == id);
    }

    #[tokio::test]
    async fn transition_unknown_job_is_not_found() {
        let store = MemoryJobStore::new();
        assert_matches!(
            store.transition(uuid::Uuid::new_v4(), Transition::Start).await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn full_lifecycle_to_completed() {
        let store = MemoryJobStore::new();
        let job = new_job();
        store.create(job.clone()).await.unwrap();

        assert_eq!(
            store.transition(job.id, Transition::Start).await.unwrap(),
            TransitionOutcome::Applied
        );
        let processing = store.get(job.id).await.unwrap();
        assert_eq!(processing.status, JobStatus::Processing);
        assert!(processing.started_at.is_some());

        let result = json!({"answer": "BMY is up"});
        store
            .transition(job.id, Transition::Complete(result.clone()))
            .await
            .unwrap();

        let done = store.get(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.result, Some(result));
        assert_eq!(done.error, None);
        assert_eq!(done.input, job.input);
        assert!(done.completed_at.is_some());
        done.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn second_claim_is_rejected() {
        let store = MemoryJobStore::new();
        let job = new_job();
        store.create(job.clone()).await.unwrap();

        store.transition(job.id, Transition::Start).await.unwrap();
        assert_eq!(
            store.transition(job.id, Transition::Start).await.unwrap(),
            TransitionOutcome::Rejected {
                current: JobStatus::Processing
            }
        );
    }

    #[tokio::test]
    async fn terminal_state_is_never_overwritten() {
        let store = MemoryJobStore::new();
        let job = new_job();
        store.create(job.clone()).await.unwrap();
        store.transition(job.id, Transition::Start).await.unwrap();
        store
            .transition(job.id, Transition::Fail("boom".into()))
            .await
            .unwrap();

        for t in [
            Transition::Start,
            Transition::Complete(json!(1)),
            Transition::Fail("again".into()),
        ] {
            assert_eq!(
                store.transition(job.id, t).await.unwrap(),
                TransitionOutcome::Rejected {
                    current: JobStatus::Failed
                }
            );
        }

        let failed = store.get(job.id).await.unwrap();
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.result.is_none());
    }

    #[tokio::test]
    async fn cannot_complete_a_pending_job() {
        let store = MemoryJobStore::new();
        let job = new_job();
        store.create(job.clone()).await.unwrap();

        assert_eq!(
            store
                .transition(job.id, Transition::Complete(json!("skip")))
                .await
                .unwrap(),
            TransitionOutcome::Rejected {
                current: JobStatus::Pending
            }
        );
    }

    #[tokio::test]
    async fn list_stale_pending_filters_and_orders() {
        let store = MemoryJobStore::new();
        let first = new_job();
        let second = new_job();
        let claimed = new_job();
        store.create(first.clone()).await.unwrap();
        store.create(second.clone()).await.unwrap();
        store.create(claimed.clone()).await.unwrap();
        store.transition(claimed.id, Transition::Start).await.unwrap();

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let stale = store.list_stale_pending(cutoff, 10).await.unwrap();
        let ids: Vec<_> = stale.iter().map(|j| j.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
        assert!(stale[0].created_at <= stale[1].created_at);

        assert_eq!(store.list_stale_pending(cutoff, 1).await.unwrap().len(), 1);

        let past = Utc::now() - chrono::Duration::hours(1);
        assert!(store.list_stale_pending(past, 10).await.unwrap().is_empty());
    }
}
