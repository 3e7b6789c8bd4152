//! Periodic cleanup of finished jobs.
//!
//! Deletes terminal jobs (with their outputs) older than the configured
//! retention period. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use synthgate_core::store::JobStore;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the retention loop until `cancel` is triggered.
pub async fn run(jobs: Arc<dyn JobStore>, retention: chrono::Duration, cancel: CancellationToken) {
    tracing::info!(
        retention_hours = retention.num_hours(),
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Result retention job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result retention job stopping");
                break;
            }
            _ = interval.tick() => {
                sweep(jobs.as_ref(), retention).await;
            }
        }
    }
}

/// One pass: purge jobs that finished before `now - retention`.
pub async fn sweep(jobs: &dyn JobStore, retention: chrono::Duration) -> u64 {
    let cutoff = Utc::now() - retention;
    match jobs.purge_finished_before(cutoff).await {
        Ok(deleted) => {
            if deleted > 0 {
                tracing::info!(deleted, "Result retention: purged finished jobs");
            } else {
                tracing::debug!("Result retention: nothing to purge");
            }
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Result retention: cleanup failed");
            0
        }
    }
}
