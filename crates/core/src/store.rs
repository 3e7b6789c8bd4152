//! Shared state store seams.
//!
//! [`LockStore`] backs the admission lock and [`JobStore`] backs the task
//! queue (job records, progress snapshots, results). Both are implemented
//! in memory ([`crate::memory`]) and on PostgreSQL (`synthgate-db`).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::job::{Job, NewJob};
use crate::output::JobOutput;
use crate::progress::Progress;
use crate::types::{JobId, Timestamp};

/// Key-value store with per-key expiry. Every operation is atomic.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Write `holder` under `key` unless an unexpired entry exists.
    ///
    /// Returns `true` if the entry was written.
    async fn set_if_absent(&self, key: &str, holder: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Delete `key` only if its current holder equals `holder`.
    async fn compare_and_delete(&self, key: &str, holder: &str) -> Result<bool, StoreError>;

    /// Current holder of an unexpired entry.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Unconditional delete. Returns `true` if an unexpired entry existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Task queue and result backend.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `PENDING` job.
    async fn enqueue(&self, job: NewJob) -> Result<Job, StoreError>;

    /// Atomically move the oldest `PENDING` job to `PROGRESS` for `worker_id`.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, StoreError>;

    /// Overwrite the progress snapshot of a job in `PROGRESS`.
    ///
    /// Returns `false` (and writes nothing) once the job is terminal.
    async fn report_progress(&self, id: JobId, progress: &Progress) -> Result<bool, StoreError>;

    /// Move a `PROGRESS` job to `SUCCESS` with its output.
    async fn complete(&self, id: JobId, output: &JobOutput) -> Result<bool, StoreError>;

    /// Move a non-terminal job to `FAILURE`.
    async fn fail(&self, id: JobId, message: &str) -> Result<bool, StoreError>;

    async fn find(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Delete terminal jobs completed before `cutoff`. Returns the count.
    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;
}
