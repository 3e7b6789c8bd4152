//! Row model for the `synthesis_jobs` table.

use sqlx::FromRow;
use synthgate_core::error::StoreError;
use synthgate_core::job::Job;
use synthgate_core::types::{JobId, Timestamp};

/// A raw row from `synthesis_jobs`. JSON columns are decoded on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub kind: String,
    pub state: String,
    pub payload: serde_json::Value,
    pub progress: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            kind: row.kind.parse()?,
            state: row.state.parse()?,
            payload: serde_json::from_value(row.payload)?,
            progress: row.progress.map(serde_json::from_value).transpose()?,
            output: row.output.map(serde_json::from_value).transpose()?,
            error_message: row.error_message,
            worker_id: row.worker_id,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use synthgate_core::job::{JobKind, JobState};

    fn row(state: &str) -> JobRow {
        JobRow {
            id: uuid::Uuid::now_v7(),
            kind: "TEMPORAL".into(),
            state: state.into(),
            payload: serde_json::json!({
                "kind": "TEMPORAL",
                "image_b64": "AQI=",
                "character_name": "Subject",
                "params": {
                    "motion_prompt": "wave",
                    "duration_frames": 4,
                    "fps": 8,
                    "motion_bucket": 127,
                    "denoising_strength": 0.2,
                    "seed": 42
                }
            }),
            progress: Some(serde_json::json!({ "percent": 40, "phase_label": "ANIMATING" })),
            output: None,
            error_message: None,
            worker_id: Some("w1".into()),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[test]
    fn row_converts_into_domain_job() {
        let job = Job::try_from(row("PROGRESS")).unwrap();
        assert_eq!(job.kind, JobKind::Temporal);
        assert_eq!(job.state, JobState::Progress);
        assert_eq!(job.progress.unwrap().percent, 40);
        assert_eq!(job.payload.kind(), JobKind::Temporal);
    }

    #[test]
    fn unknown_state_is_corrupt() {
        let err = Job::try_from(row("RETRYING")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
