//! Repository for the `synthesis_jobs` table.
//!
//! State transitions are guarded in SQL (`WHERE state = ...`) so terminal
//! states stay absorbing even if a late writer races the worker.

use sqlx::{PgExecutor, PgPool};
use synthgate_core::job::{JobState, NewJob};
use synthgate_core::types::{JobId, Timestamp};

use crate::models::job::JobRow;

/// Column list for `synthesis_jobs` queries.
const COLUMNS: &str = "\
    id, kind, state, payload, progress, output, error_message, worker_id, \
    created_at, started_at, completed_at";

/// Provides queue and result operations for synthesis jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new pending job.
    ///
    /// Takes any executor so the caller can insert inside a transaction.
    pub async fn enqueue<'e, E>(
        executor: E,
        job: &NewJob,
        payload: &serde_json::Value,
    ) -> Result<JobRow, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO synthesis_jobs (id, kind, state, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job.id)
            .bind(job.kind().as_str())
            .bind(JobState::Pending.as_str())
            .bind(payload)
            .fetch_one(executor)
            .await
    }

    /// Atomically claim the oldest pending job for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: &str,
        initial_progress: &serde_json::Value,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE synthesis_jobs \
             SET state = $1, worker_id = $2, started_at = NOW(), progress = $3 \
             WHERE id = ( \
                 SELECT id FROM synthesis_jobs \
                 WHERE state = $4 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(JobState::Progress.as_str())
            .bind(worker_id)
            .bind(initial_progress)
            .bind(JobState::Pending.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the progress snapshot of a running job.
    pub async fn update_progress(
        pool: &PgPool,
        job_id: JobId,
        progress: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs SET progress = $2 WHERE id = $1 AND state = $3",
        )
        .bind(job_id)
        .bind(progress)
        .bind(JobState::Progress.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as succeeded with its output payload.
    pub async fn complete(
        pool: &PgPool,
        job_id: JobId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs \
             SET state = $2, output = $3, completed_at = NOW() \
             WHERE id = $1 AND state = $4",
        )
        .bind(job_id)
        .bind(JobState::Success.as_str())
        .bind(output)
        .bind(JobState::Progress.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a non-terminal job as failed. No automatic retry is performed.
    pub async fn fail(pool: &PgPool, job_id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs \
             SET state = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND state IN ($4, $5)",
        )
        .bind(job_id)
        .bind(JobState::Failure.as_str())
        .bind(error)
        .bind(JobState::Pending.as_str())
        .bind(JobState::Progress.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, job_id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM synthesis_jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete terminal jobs that completed before `cutoff`.
    pub async fn delete_finished_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM synthesis_jobs \
             WHERE state IN ($1, $2) AND completed_at < $3",
        )
        .bind(JobState::Success.as_str())
        .bind(JobState::Failure.as_str())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
