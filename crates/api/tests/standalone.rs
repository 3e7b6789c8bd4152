//! Integration tests for the embedded worker used without a database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::png_fixture;
use synthgate_api::standalone::EmbeddedWorker;
use synthgate_core::admission::AdmissionGate;
use synthgate_core::job::{JobState, NewJob};
use synthgate_core::memory::{MemoryJobStore, MemoryLockStore};
use synthgate_core::payload::{JobPayload, TransformParams, TransformPayload};
use synthgate_core::store::JobStore;
use synthgate_core::types::{new_job_id, JobId};
use synthgate_pipeline::MetadataAnalyzer;
use tokio_util::sync::CancellationToken;

fn transform() -> JobPayload {
    JobPayload::Static(TransformPayload {
        image: png_fixture(),
        character_name: "Subject".into(),
        feature_prompt: String::new(),
        params: TransformParams {
            resolution_anchor: 64,
            steps: 3,
            ..TransformParams::default()
        },
    })
}

fn stores() -> (Arc<dyn JobStore>, AdmissionGate) {
    let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let gate = AdmissionGate::with_defaults(Arc::new(MemoryLockStore::new()));
    (jobs, gate)
}

/// Poll until `done` holds for the job record (or its absence).
async fn wait_for(jobs: &dyn JobStore, id: JobId, done: impl Fn(Option<JobState>) -> bool) {
    for _ in 0..200 {
        let state = jobs.find(id).await.unwrap().map(|job| job.state);
        if done(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {id} did not reach the expected state");
}

// ---------------------------------------------------------------------------
// Test: the embedded runner drains the queue and frees the lock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embedded_runner_completes_queued_job() {
    let (jobs, gate) = stores();
    let id = new_job_id();
    assert!(gate.try_acquire(id).await.unwrap());
    jobs.enqueue(NewJob::new(id, transform())).await.unwrap();

    let cancel = CancellationToken::new();
    let worker = EmbeddedWorker::spawn(
        jobs.clone(),
        gate.clone(),
        Arc::new(MetadataAnalyzer::default()),
        chrono::Duration::hours(24),
        cancel.clone(),
    );

    wait_for(jobs.as_ref(), id, |state| state == Some(JobState::Success)).await;
    cancel.cancel();
    worker.join(Duration::from_secs(5)).await;

    assert!(!gate.is_locked().await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: finished jobs are purged once past the retention window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn finished_jobs_are_purged() {
    let (jobs, gate) = stores();
    let finished = new_job_id();
    jobs.enqueue(NewJob::new(finished, transform())).await.unwrap();
    jobs.fail(finished, "boom").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let cancel = CancellationToken::new();
    let worker = EmbeddedWorker::spawn(
        jobs.clone(),
        gate,
        Arc::new(MetadataAnalyzer::default()),
        chrono::Duration::zero(),
        cancel.clone(),
    );

    wait_for(jobs.as_ref(), finished, |state| state.is_none()).await;
    cancel.cancel();
    worker.join(Duration::from_secs(5)).await;
}
