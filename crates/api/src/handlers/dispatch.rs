//! Handlers that admit synthesis jobs.
//!
//! Admission order: a cheap busy pre-check, then the body is read and
//! validated, then the lock is taken for a fresh job id and the job is
//! queued. If queueing fails the lock is released before answering.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use synthgate_core::job::NewJob;
use synthgate_core::payload::JobPayload;
use synthgate_core::types::{new_job_id, JobId};

use crate::error::{AppError, AppResult};
use crate::form::UploadForm;
use crate::state::AppState;

/// Status reported for a freshly admitted job.
pub const QUEUED: &str = "QUEUED";

/// Body returned once a job is queued.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub task_id: JobId,
    pub status: &'static str,
}

/// POST /transform
pub async fn transform(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DispatchResponse>> {
    ensure_idle(&state).await?;
    let payload = UploadForm::read(multipart).await?.into_transform()?;
    dispatch(&state, payload).await
}

/// POST /animate
pub async fn animate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DispatchResponse>> {
    ensure_idle(&state).await?;
    let payload = UploadForm::read(multipart).await?.into_animate()?;
    dispatch(&state, payload).await
}

/// Reject early while the accelerator is held, before reading the upload.
async fn ensure_idle(state: &AppState) -> AppResult<()> {
    if state.gate.is_locked().await? {
        return Err(AppError::HardwareBusy);
    }
    Ok(())
}

async fn dispatch(state: &AppState, payload: JobPayload) -> AppResult<Json<DispatchResponse>> {
    payload.validate()?;

    let task_id = new_job_id();
    let kind = payload.kind();
    if !state.gate.try_acquire(task_id).await? {
        tracing::info!(%kind, "Dispatch rejected: hardware busy");
        return Err(AppError::HardwareBusy);
    }

    if let Err(e) = state.jobs.enqueue(NewJob::new(task_id, payload)).await {
        if let Err(release_err) = state.gate.release(task_id).await {
            tracing::error!(%task_id, error = %release_err, "Lock release after failed dispatch failed");
        }
        return Err(AppError::DispatchFailed(e.to_string()));
    }

    tracing::info!(%task_id, %kind, "Job queued");
    Ok(Json(DispatchResponse {
        task_id,
        status: QUEUED,
    }))
}
