//! Embedded worker for running without a database.
//!
//! The API and a single [`JobRunner`] share the in-memory stores. The result
//! retention sweep runs alongside so finished jobs, with their uploads and
//! outputs, do not accumulate for the life of the process.

use std::sync::Arc;
use std::time::Duration;

use synthgate_core::admission::AdmissionGate;
use synthgate_core::store::JobStore;
use synthgate_pipeline::MetadataAnalyzer;
use synthgate_worker::{reference_orchestrator, retention, JobRunner};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handles on the embedded runner and retention tasks.
pub struct EmbeddedWorker {
    runner: JoinHandle<()>,
    retention: JoinHandle<()>,
}

impl EmbeddedWorker {
    /// Spawn both tasks; they stop when `cancel` fires.
    pub fn spawn(
        jobs: Arc<dyn JobStore>,
        gate: AdmissionGate,
        analyzer: Arc<MetadataAnalyzer>,
        result_retention: chrono::Duration,
        cancel: CancellationToken,
    ) -> Self {
        let runner = JobRunner::new(
            jobs.clone(),
            gate,
            Arc::new(reference_orchestrator(analyzer)),
            format!("embedded-{}", std::process::id()),
        );
        let runner_cancel = cancel.clone();
        let runner = tokio::spawn(async move { runner.run(runner_cancel).await });
        let retention = tokio::spawn(retention::run(jobs, result_retention, cancel));

        Self { runner, retention }
    }

    /// Wait up to `timeout` for both tasks after cancellation.
    pub async fn join(self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.runner).await.is_err() {
            tracing::warn!("Embedded runner did not stop in time");
        }
        if tokio::time::timeout(timeout, self.retention).await.is_err() {
            tracing::warn!("Retention task did not stop in time");
        }
    }
}
