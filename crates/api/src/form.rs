//! Multipart form decoding for the upload endpoints.
//!
//! Every endpoint takes one `file` part with the image bytes plus text
//! fields. Omitted numeric fields fall back to the payload defaults; a field
//! that is present but unparsable is a 400.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use synthgate_core::payload::{
    AnimateParams, AnimatePayload, JobPayload, TransformParams, TransformPayload,
};

use crate::error::{AppError, AppResult};

/// Name of the part carrying the image bytes.
pub const FILE_FIELD: &str = "file";

/// A fully read multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    file: Option<Vec<u8>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain `multipart` into memory.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == FILE_FIELD {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some(data.to_vec());
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// The uploaded image; missing or empty is a 400.
    pub fn take_file(&mut self) -> AppResult<Vec<u8>> {
        match self.file.take() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(AppError::BadRequest(format!(
                "Missing '{FILE_FIELD}' upload"
            ))),
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text field or `default` when absent.
    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.text(name).unwrap_or(default).to_string()
    }

    /// Parse a field, falling back to `default` when absent or blank.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> AppResult<T> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid value for '{name}': {raw}"))),
        }
    }

    /// Build a STATIC payload from `/transform` fields.
    pub fn into_transform(mut self) -> AppResult<JobPayload> {
        let image = self.take_file()?;
        let d = TransformParams::default();
        let params = TransformParams {
            resolution_anchor: self.parse_or("resolution_anchor", d.resolution_anchor)?,
            steps: self.parse_or("steps", d.steps)?,
            cfg_scale: self.parse_or("cfg_scale", d.cfg_scale)?,
            cn_depth: self.parse_or("cn_depth", d.cn_depth)?,
            cn_pose: self.parse_or("cn_pose", d.cn_pose)?,
            strength: self.parse_or("strength", d.strength)?,
            canny_low: self.parse_or("canny_low", d.canny_low)?,
            canny_high: self.parse_or("canny_high", d.canny_high)?,
            seed: self.parse_or("seed", d.seed)?,
            negative_prompt: self.text_or("negative_prompt", &d.negative_prompt),
        };
        Ok(JobPayload::Static(TransformPayload {
            image,
            character_name: self.text_or("character_name", ""),
            feature_prompt: self.text_or("feature_prompt", ""),
            params,
        }))
    }

    /// Build a TEMPORAL payload from `/animate` fields.
    pub fn into_animate(mut self) -> AppResult<JobPayload> {
        let image = self.take_file()?;
        let d = AnimateParams::default();
        let params = AnimateParams {
            motion_prompt: self.text_or("motion_prompt", &d.motion_prompt),
            duration_frames: self.parse_or("duration_frames", d.duration_frames)?,
            fps: self.parse_or("fps", d.fps)?,
            motion_bucket: self.parse_or("motion_bucket", d.motion_bucket)?,
            denoising_strength: self.parse_or("denoising_strength", d.denoising_strength)?,
            seed: self.parse_or("seed", d.seed)?,
        };
        Ok(JobPayload::Temporal(AnimatePayload {
            image,
            character_name: self.text_or("character_name", ""),
            params,
        }))
    }
}
