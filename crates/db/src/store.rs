//! [`LockStore`] and [`JobStore`] on top of the PostgreSQL repositories.

use std::time::Duration;

use async_trait::async_trait;
use synthgate_core::error::StoreError;
use synthgate_core::job::{Job, NewJob};
use synthgate_core::output::JobOutput;
use synthgate_core::progress::{Progress, PHASE_INITIALIZING};
use synthgate_core::store::{JobStore, LockStore};
use synthgate_core::types::{JobId, Timestamp};

use crate::repositories::{JobRepo, LockRepo};
use crate::DbPool;

/// PostgreSQL-backed shared state store. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl LockStore for PgStore {
    async fn set_if_absent(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        LockRepo::set_if_absent(&self.pool, key, holder, ttl)
            .await
            .map_err(backend)
    }

    async fn compare_and_delete(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        LockRepo::compare_and_delete(&self.pool, key, holder)
            .await
            .map_err(backend)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        LockRepo::get(&self.pool, key).await.map_err(backend)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        LockRepo::delete(&self.pool, key).await.map_err(backend)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn enqueue(&self, job: NewJob) -> Result<Job, StoreError> {
        let payload = serde_json::to_value(&job.payload)?;
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = JobRepo::enqueue(&mut *tx, &job, &payload)
            .await
            .map_err(backend)?;
        // Dropping the transaction rolls back a row that cannot be read back.
        let job = Job::try_from(row)?;
        tx.commit().await.map_err(backend)?;
        Ok(job)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, StoreError> {
        let initial = serde_json::to_value(Progress::new(0, PHASE_INITIALIZING))?;
        let Some(row) = JobRepo::claim_next(&self.pool, worker_id, &initial)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };

        let job_id = row.id;
        match Job::try_from(row) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                // A claimed row is PROGRESS; leave it terminal rather than stuck.
                tracing::error!(%job_id, error = %e, "Claimed job record is unreadable; failing it");
                JobRepo::fail(&self.pool, job_id, &format!("Unreadable job record: {e}"))
                    .await
                    .map_err(backend)?;
                Err(e)
            }
        }
    }

    async fn report_progress(&self, id: JobId, progress: &Progress) -> Result<bool, StoreError> {
        let value = serde_json::to_value(progress)?;
        JobRepo::update_progress(&self.pool, id, &value)
            .await
            .map_err(backend)
    }

    async fn complete(&self, id: JobId, output: &JobOutput) -> Result<bool, StoreError> {
        let value = serde_json::to_value(output)?;
        JobRepo::complete(&self.pool, id, &value)
            .await
            .map_err(backend)
    }

    async fn fail(&self, id: JobId, message: &str) -> Result<bool, StoreError> {
        JobRepo::fail(&self.pool, id, message).await.map_err(backend)
    }

    async fn find(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        JobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(Job::try_from)
            .transpose()
    }

    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        JobRepo::delete_finished_before(&self.pool, cutoff)
            .await
            .map_err(backend)
    }
}
