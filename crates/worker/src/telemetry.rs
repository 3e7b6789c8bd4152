//! Progress telemetry from a running job to the job store.
//!
//! The blocking orchestrator side publishes snapshots into a
//! `tokio::sync::watch` channel through [`TelemetrySink`]; an async flusher
//! task writes whatever snapshot is latest to [`JobStore::report_progress`].
//! Intermediate snapshots may be skipped. Write failures are logged and
//! never reach the job.

use std::sync::{Arc, Mutex};

use synthgate_core::codec::encode_base64;
use synthgate_core::progress::{
    percent_of, Progress, ProgressNote, ProgressReporter, ProgressSink, TelemetryError,
};
use synthgate_core::store::JobStore;
use synthgate_core::types::JobId;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Publishes snapshots into a watch channel. Only the latest is kept.
pub struct ChannelReporter {
    tx: watch::Sender<Option<Progress>>,
}

impl ChannelReporter {
    pub fn new(tx: watch::Sender<Option<Progress>>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, job_id: JobId, progress: Progress) -> Result<(), TelemetryError> {
        self.tx
            .send(Some(progress))
            .map_err(|_| TelemetryError::ChannelClosed(job_id))
    }
}

/// Spawn the task that drains `rx` into the store.
///
/// The task ends once every sender is dropped, after writing the last
/// snapshot it has not seen yet. Await it before recording a terminal state.
pub fn spawn_flusher(
    jobs: Arc<dyn JobStore>,
    job_id: JobId,
    mut rx: watch::Receiver<Option<Progress>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let Some(progress) = snapshot else {
                continue;
            };
            match jobs.report_progress(job_id, &progress).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(%job_id, "Progress dropped; job no longer running");
                }
                Err(e) => {
                    tracing::warn!(%job_id, error = %e, "Progress write failed");
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

struct PhaseState {
    label: String,
    last_percent: u8,
}

/// Adapts capability ticks into [`Progress`] snapshots.
///
/// Percent is held non-decreasing within a phase and restarts when a new
/// phase label arrives. Ticks without a phase reuse the current label.
pub struct TelemetrySink<R> {
    job_id: JobId,
    reporter: R,
    phase: Mutex<PhaseState>,
}

impl<R: ProgressReporter> TelemetrySink<R> {
    pub fn new(job_id: JobId, reporter: R, initial_phase: impl Into<String>) -> Self {
        Self {
            job_id,
            reporter,
            phase: Mutex::new(PhaseState {
                label: initial_phase.into(),
                last_percent: 0,
            }),
        }
    }
}

impl<R: ProgressReporter> ProgressSink for TelemetrySink<R> {
    fn tick(&self, current: u32, total: u32, note: Option<ProgressNote>) {
        let mut preview = None;
        let progress = {
            let mut phase = match self.phase.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match note {
                Some(ProgressNote::Phase(label)) if label != phase.label => {
                    phase.label = label;
                    phase.last_percent = 0;
                }
                Some(ProgressNote::Preview(bytes)) => preview = Some(encode_base64(&bytes)),
                _ => {}
            }
            let percent = percent_of(current, total).max(phase.last_percent);
            phase.last_percent = percent;
            Progress::new(percent, phase.label.clone())
        };
        let progress = match preview {
            Some(encoded) => progress.with_preview(encoded),
            None => progress,
        };

        if let Err(e) = self.reporter.report(self.job_id, progress) {
            tracing::debug!(job_id = %self.job_id, error = %e, "Progress tick dropped");
        }
    }
}
