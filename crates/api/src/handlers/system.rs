use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub message: &'static str,
    /// Whether a live lock was removed.
    pub released: bool,
}

/// POST /system/unlock -- administrative override, deletes the lock
/// regardless of holder.
pub async fn unlock(State(state): State<AppState>) -> AppResult<Json<UnlockResponse>> {
    let released = state.gate.force_unlock().await?;
    Ok(Json(UnlockResponse {
        message: "Hardware lock released",
        released,
    }))
}
