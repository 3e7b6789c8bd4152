//! Handlers for polling job status and fetching results.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use synthgate_core::error::CoreError;
use synthgate_core::job::{Job, JobState};
use synthgate_core::progress::Progress;
use synthgate_core::types::JobId;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobState,
    /// Present only while the job is running.
    pub progress: Option<Progress>,
}

async fn load(state: &AppState, task_id: JobId) -> AppResult<Job> {
    state
        .jobs
        .find(task_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Task",
                id: task_id,
            }
            .into()
        })
}

/// GET /status/{task_id}
///
/// A terminal job that still holds the accelerator lock releases it here.
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<JobId>,
) -> AppResult<Json<StatusResponse>> {
    let job = load(&state, task_id).await?;

    if job.state.is_terminal() {
        match state.gate.release(task_id).await {
            Ok(true) => tracing::info!(%task_id, "Lock released on status poll"),
            Ok(false) => {}
            Err(e) => tracing::warn!(%task_id, error = %e, "Lock release on status poll failed"),
        }
    }

    let progress = match job.state {
        JobState::Progress => job.progress,
        _ => None,
    };
    Ok(Json(StatusResponse {
        status: job.state,
        progress,
    }))
}

/// GET /result/{task_id}
///
/// `202` while the job is not terminal; the output on success; the error
/// message on failure.
pub async fn result(
    State(state): State<AppState>,
    Path(task_id): Path<JobId>,
) -> AppResult<Response> {
    let job = load(&state, task_id).await?;

    let response = match job.state {
        JobState::Pending | JobState::Progress => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": job.state })),
        )
            .into_response(),
        JobState::Success => match job.output {
            Some(output) => Json(output).into_response(),
            None => {
                return Err(CoreError::Internal(format!("task {task_id} succeeded without output")).into())
            }
        },
        JobState::Failure => Json(json!({
            "status": JobState::Failure,
            "error": job.error_message.unwrap_or_default(),
        }))
        .into_response(),
    };
    Ok(response)
}
