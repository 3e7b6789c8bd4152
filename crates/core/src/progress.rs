//! Progress telemetry contract.
//!
//! Capabilities see a [`ProgressSink`]: an infallible tick callback. The
//! worker turns ticks into [`Progress`] snapshots and hands them to a
//! [`ProgressReporter`], whose failures are logged by the caller and never
//! reach the job. Only the latest snapshot per job is kept.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

// ---------------------------------------------------------------------------
// Phase labels
// ---------------------------------------------------------------------------

pub const PHASE_INITIALIZING: &str = "INITIALIZING";
pub const PHASE_SYNTHESIZING_IMAGE: &str = "SYNTHESIZING_IMAGE";
pub const PHASE_FINALIZING: &str = "FINALIZING";
pub const PHASE_DECODING_INPUT: &str = "DECODING_INPUT";
pub const PHASE_ANIMATING: &str = "ANIMATING";
pub const PHASE_GENERATING_LATENTS: &str = "GENERATING_LATENTS";
pub const PHASE_ENCODING_VIDEO_FRAMES: &str = "ENCODING_VIDEO_FRAMES";
pub const PHASE_ENCODING_CONTAINER: &str = "ENCODING_CONTAINER";

// ---------------------------------------------------------------------------
// Progress snapshot
// ---------------------------------------------------------------------------

/// Latest observable progress of a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// 0..=100.
    pub percent: u8,
    pub phase_label: String,
    /// Intermediate artifact (e.g. a PNG thumbnail), base64 encoded.
    #[serde(rename = "preview_b64", skip_serializing_if = "Option::is_none", default)]
    pub preview: Option<String>,
}

impl Progress {
    pub fn new(percent: u8, phase_label: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase_label: phase_label.into(),
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview_b64: String) -> Self {
        self.preview = Some(preview_b64);
        self
    }
}

/// `clamp(100 * current / total, 0, 100)`; a zero total reads as complete.
pub fn percent_of(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (u64::from(current) * 100) / u64::from(total);
    pct.min(100) as u8
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Optional extra carried by a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressNote {
    /// The capability entered a new named phase.
    Phase(String),
    /// Encoded intermediate artifact (raw bytes, e.g. PNG).
    Preview(Vec<u8>),
}

/// Callback handed to capabilities. Ticks cannot fail.
pub trait ProgressSink: Send + Sync {
    fn tick(&self, current: u32, total: u32, note: Option<ProgressNote>);
}

/// A sink that drops every tick.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn tick(&self, _current: u32, _total: u32, _note: Option<ProgressNote>) {}
}

/// Telemetry write failed; never escalated to job failure.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Telemetry channel closed for job {0}")]
    ChannelClosed(JobId),

    #[error("Telemetry write failed: {0}")]
    Write(String),
}

/// Destination for progress snapshots of a job.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, job_id: JobId, progress: Progress) -> Result<(), TelemetryError>;
}
