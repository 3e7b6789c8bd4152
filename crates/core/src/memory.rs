//! In-process implementations of [`LockStore`] and [`JobStore`].
//!
//! Used by standalone mode (API and worker in one process, no database) and
//! by tests. Expiry is measured on the Tokio clock so paused-time tests can
//! advance past a TTL deterministically.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::job::{Job, JobState, NewJob};
use crate::output::JobOutput;
use crate::progress::{Progress, PHASE_INITIALIZING};
use crate::store::{JobStore, LockStore};
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// MemoryLockStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct LockEntry {
    holder: String,
    expires_at: Instant,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Lock table guarded by a single mutex; each trait call is one critical
/// section, which makes set-if-absent and compare-and-delete atomic.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    entries: Mutex<HashMap<String, LockEntry>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            LockEntry {
                holder: holder.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.holder == holder => {
                let was_live = entry.is_live(now);
                entries.remove(key);
                Ok(was_live)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.holder.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }
}

// ---------------------------------------------------------------------------
// MemoryJobStore
// ---------------------------------------------------------------------------

/// Job table kept in insertion order so `claim_next` is FIFO.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.iter().any(|j| j.id == new_job.id) {
            return Err(StoreError::Backend(format!(
                "job {} already exists",
                new_job.id
            )));
        }
        let job = Job {
            id: new_job.id,
            kind: new_job.kind(),
            state: JobState::Pending,
            payload: new_job.payload,
            progress: None,
            output: None,
            error_message: None,
            worker_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        jobs.push(job.clone());
        Ok(job)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|j| j.state == JobState::Pending) else {
            return Ok(None);
        };
        job.state = JobState::Progress;
        job.worker_id = Some(worker_id.to_string());
        job.started_at = Some(Utc::now());
        job.progress = Some(Progress::new(0, PHASE_INITIALIZING));
        Ok(Some(job.clone()))
    }

    async fn report_progress(&self, id: JobId, progress: &Progress) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        match jobs
            .iter_mut()
            .find(|j| j.id == id && j.state == JobState::Progress)
        {
            Some(job) => {
                job.progress = Some(progress.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete(&self, id: JobId, output: &JobOutput) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        match jobs
            .iter_mut()
            .find(|j| j.id == id && j.state == JobState::Progress)
        {
            Some(job) => {
                job.state = JobState::Success;
                job.output = Some(output.clone());
                job.completed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fail(&self, id: JobId, message: &str) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        match jobs
            .iter_mut()
            .find(|j| j.id == id && !j.state.is_terminal())
        {
            Some(job) => {
                job.state = JobState::Failure;
                job.error_message = Some(message.to_string());
                job.completed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn purge_finished_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|j| !(j.state.is_terminal() && j.completed_at.is_some_and(|t| t < cutoff)));
        Ok((before - jobs.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
