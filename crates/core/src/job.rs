//! Job records as seen by the dispatch boundary, the store, and the worker.
//!
//! A job is created `PENDING` at dispatch, moved to `PROGRESS` when a worker
//! claims it, and finishes in exactly one of the absorbing states `SUCCESS`
//! or `FAILURE`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::output::JobOutput;
use crate::payload::JobPayload;
use crate::progress::Progress;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// JobKind
// ---------------------------------------------------------------------------

/// Category of work, and the engine kind it needs resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// Single still image.
    Static,
    /// Multi-frame clip.
    Temporal,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Static => "STATIC",
            JobKind::Temporal => "TEMPORAL",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STATIC" => Ok(JobKind::Static),
            "TEMPORAL" => Ok(JobKind::Temporal),
            other => Err(StoreError::Corrupt(format!("unknown job kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle state as reported to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Progress => "PROGRESS",
            JobState::Success => "SUCCESS",
            JobState::Failure => "FAILURE",
        }
    }

    /// `SUCCESS` and `FAILURE` are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobState::Pending),
            "PROGRESS" => Ok(JobState::Progress),
            "SUCCESS" => Ok(JobState::Success),
            "FAILURE" => Ok(JobState::Failure),
            other => Err(StoreError::Corrupt(format!("unknown job state '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job as stored in the shared state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub payload: JobPayload,
    /// Latest telemetry snapshot; absent until a worker claims the job.
    pub progress: Option<Progress>,
    /// Present only in `SUCCESS`.
    pub output: Option<JobOutput>,
    /// Present only in `FAILURE`.
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Input for [`JobStore::enqueue`](crate::store::JobStore::enqueue).
///
/// The id is allocated by the dispatcher before the lock is taken so the
/// same value can serve as the lock holder.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: JobId,
    pub payload: JobPayload,
}

impl NewJob {
    pub fn new(id: JobId, payload: JobPayload) -> Self {
        Self { id, payload }
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_wire_name() {
        for kind in [JobKind::Static, JobKind::Temporal] {
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::json!(kind.as_str())
            );
        }
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Progress.is_terminal());
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failure.is_terminal());
    }

    #[test]
    fn unknown_state_is_reported_as_corrupt() {
        let err = "STARTED".parse::<JobState>().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
