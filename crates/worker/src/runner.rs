//! Claim loop: one job at a time per worker process.
//!
//! Polls the job store every `poll_interval`, runs the claimed job on a
//! blocking thread, records the terminal state, then releases the
//! accelerator lock if the job still holds it.

use std::sync::Arc;
use std::time::Duration;

use synthgate_core::admission::AdmissionGate;
use synthgate_core::error::StoreError;
use synthgate_core::job::Job;
use synthgate_core::progress::PHASE_INITIALIZING;
use synthgate_core::store::JobStore;
use synthgate_core::types::JobId;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::Orchestrator;
use crate::telemetry::{spawn_flusher, ChannelReporter, TelemetrySink};

/// Default polling interval for the claim loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct JobRunner {
    jobs: Arc<dyn JobStore>,
    gate: AdmissionGate,
    orchestrator: Arc<Orchestrator>,
    worker_id: String,
    poll_interval: Duration,
}

impl JobRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        gate: AdmissionGate,
        orchestrator: Arc<Orchestrator>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            gate,
            orchestrator,
            worker_id: worker_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the claim loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            worker_id = %self.worker_id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job runner started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // Drain the queue before waiting for the next tick.
                    loop {
                        match self.run_once(&cancel).await {
                            Ok(true) if !cancel.is_cancelled() => continue,
                            Ok(_) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "Claim cycle failed");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Claim and execute the next pending job. `Ok(false)` when the queue
    /// is empty.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<bool, StoreError> {
        let Some(job) = self.jobs.claim_next(&self.worker_id).await? else {
            return Ok(false);
        };
        tracing::info!(job_id = %job.id, kind = %job.kind, worker_id = %self.worker_id, "Job claimed");
        self.execute(job, cancel).await;
        Ok(true)
    }

    async fn execute(&self, job: Job, cancel: &CancellationToken) {
        let job_id = job.id;
        let (tx, rx) = watch::channel(None);
        let flusher = spawn_flusher(Arc::clone(&self.jobs), job_id, rx);

        let orchestrator = Arc::clone(&self.orchestrator);
        let cancel = cancel.clone();
        let payload = job.payload;
        let outcome = tokio::task::spawn_blocking(move || {
            let sink = TelemetrySink::new(job_id, ChannelReporter::new(tx), PHASE_INITIALIZING);
            orchestrator.run(job_id, &payload, &sink, &cancel)
        })
        .await;

        // The sender is gone once the closure returns; wait for the last
        // snapshot so it cannot land after the terminal write.
        if let Err(e) = flusher.await {
            tracing::warn!(%job_id, error = %e, "Progress flusher ended abnormally");
        }

        let recorded = match outcome {
            Ok(Ok(output)) => {
                tracing::info!(%job_id, "Job succeeded");
                self.jobs.complete(job_id, &output).await
            }
            Ok(Err(e)) => {
                tracing::error!(%job_id, error = %e, "Job failed");
                self.jobs.fail(job_id, &e.to_string()).await
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "Job task panicked");
                self.jobs.fail(job_id, "Worker task panicked").await
            }
        };
        if let Err(e) = recorded {
            tracing::error!(%job_id, error = %e, "Failed to record job outcome");
        }

        self.release_lock(job_id).await;
    }

    async fn release_lock(&self, job_id: JobId) {
        match self.gate.release(job_id).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(%job_id, "Lock not held by job at completion"),
            Err(e) => tracing::error!(%job_id, error = %e, "Lock release failed"),
        }
    }
}
