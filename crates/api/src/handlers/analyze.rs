//! Subject analysis endpoint. Runs in-process; no lock, no queue.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use synthgate_core::capability::SubjectAnalysis;

use crate::error::{AppError, AppResult};
use crate::form::UploadForm;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub steps: u32,
    pub cfg_scale: f32,
    pub cn_scale_depth: f32,
    pub cn_scale_pose: f32,
    pub strength: f32,
    pub canny_low: u32,
    pub canny_high: u32,
    pub texture_prompt: String,
    pub negative_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub detected_essence: String,
    pub recommendations: Recommendations,
}

impl From<SubjectAnalysis> for AnalyzeResponse {
    fn from(analysis: SubjectAnalysis) -> Self {
        let texture_prompt = analysis.suggested_prompt();
        let w = analysis.weights;
        AnalyzeResponse {
            status: "success",
            detected_essence: analysis.detected_essence,
            recommendations: Recommendations {
                steps: w.steps,
                cfg_scale: w.cfg_scale,
                cn_scale_depth: w.cn_depth,
                cn_scale_pose: w.cn_pose,
                strength: w.strength,
                canny_low: w.canny_low,
                canny_high: w.canny_high,
                texture_prompt,
                negative_prompt: analysis.negative_prompt,
            },
        }
    }
}

/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let bytes = form.take_file()?;
    let subject_name = form.text_or("character_name", "");

    let analyzer = Arc::clone(&state.analyzer);
    let analysis = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
        analyzer
            .analyze(&image, &subject_name)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| AppError::AnalysisFailed(e.to_string()))?
    .map_err(AppError::AnalysisFailed)?;

    tracing::info!(essence = %analysis.detected_essence, "Subject analyzed");
    Ok(Json(analysis.into()))
}
