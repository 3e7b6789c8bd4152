//! Kind-specific job inputs and their hyperparameters.
//!
//! Defaults mirror what the dispatch endpoints apply when a form field is
//! omitted. Ranges are enforced with `validator` before a job is admitted.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::job::JobKind;

// ---------------------------------------------------------------------------
// Transform (STATIC)
// ---------------------------------------------------------------------------

pub const DEFAULT_RESOLUTION_ANCHOR: u32 = 512;
pub const DEFAULT_STEPS: u32 = 30;
pub const DEFAULT_CFG_SCALE: f32 = 7.5;
pub const DEFAULT_CN_DEPTH: f32 = 0.75;
pub const DEFAULT_CN_POSE: f32 = 0.40;
pub const DEFAULT_STRENGTH: f32 = 0.70;
pub const DEFAULT_CANNY_LOW: u32 = 100;
pub const DEFAULT_CANNY_HIGH: u32 = 200;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_NEGATIVE_PROMPT: &str = "anime, cartoon";

/// Numeric hyperparameters for a still-image transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_canny_band"))]
pub struct TransformParams {
    #[validate(range(min = 64, max = 2048))]
    pub resolution_anchor: u32,
    #[validate(range(min = 1, max = 150))]
    pub steps: u32,
    #[validate(range(min = 0.0, max = 30.0), custom(function = "finite"))]
    pub cfg_scale: f32,
    #[validate(range(min = 0.0, max = 2.0), custom(function = "finite"))]
    pub cn_depth: f32,
    #[validate(range(min = 0.0, max = 2.0), custom(function = "finite"))]
    pub cn_pose: f32,
    #[validate(range(min = 0.0, max = 1.0), custom(function = "finite"))]
    pub strength: f32,
    #[validate(range(max = 255))]
    pub canny_low: u32,
    #[validate(range(max = 255))]
    pub canny_high: u32,
    pub seed: u64,
    #[validate(length(max = 2000))]
    pub negative_prompt: String,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            resolution_anchor: DEFAULT_RESOLUTION_ANCHOR,
            steps: DEFAULT_STEPS,
            cfg_scale: DEFAULT_CFG_SCALE,
            cn_depth: DEFAULT_CN_DEPTH,
            cn_pose: DEFAULT_CN_POSE,
            strength: DEFAULT_STRENGTH,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            seed: DEFAULT_SEED,
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
        }
    }
}

fn validate_canny_band(params: &TransformParams) -> Result<(), ValidationError> {
    if params.canny_low >= params.canny_high {
        let mut err = ValidationError::new("canny_band");
        err.message = Some("canny_low must be lower than canny_high".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects NaN and infinities; `range` lets NaN through.
fn finite(value: f32) -> Result<(), ValidationError> {
    if value.is_finite() {
        return Ok(());
    }
    let mut err = ValidationError::new("finite");
    err.message = Some("must be a finite number".into());
    Err(err)
}

impl TransformParams {
    /// Steps the sampler actually runs once `strength` is applied.
    pub fn effective_steps(&self) -> u32 {
        ((self.steps as f32 * self.strength).floor() as u32).max(1)
    }
}

/// Input for a STATIC job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformPayload {
    #[serde(rename = "image_b64", with = "crate::codec::base64_bytes")]
    pub image: Vec<u8>,
    pub character_name: String,
    pub feature_prompt: String,
    pub params: TransformParams,
}

// ---------------------------------------------------------------------------
// Animate (TEMPORAL)
// ---------------------------------------------------------------------------

pub const DEFAULT_MOTION_PROMPT: &str = "subtle realistic movement, breathing";
pub const DEFAULT_DURATION_FRAMES: u32 = 24;
pub const DEFAULT_FPS: u32 = 8;
pub const DEFAULT_MOTION_BUCKET: u32 = 127;
pub const DEFAULT_DENOISING_STRENGTH: f32 = 0.20;

/// Hyperparameters for a clip animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnimateParams {
    #[validate(length(max = 2000))]
    pub motion_prompt: String,
    #[validate(range(min = 1, max = 240))]
    pub duration_frames: u32,
    #[validate(range(min = 1, max = 60))]
    pub fps: u32,
    #[validate(range(max = 255))]
    pub motion_bucket: u32,
    #[validate(range(min = 0.0, max = 1.0), custom(function = "finite"))]
    pub denoising_strength: f32,
    pub seed: u64,
}

impl Default for AnimateParams {
    fn default() -> Self {
        Self {
            motion_prompt: DEFAULT_MOTION_PROMPT.to_string(),
            duration_frames: DEFAULT_DURATION_FRAMES,
            fps: DEFAULT_FPS,
            motion_bucket: DEFAULT_MOTION_BUCKET,
            denoising_strength: DEFAULT_DENOISING_STRENGTH,
            seed: DEFAULT_SEED,
        }
    }
}

/// Input for a TEMPORAL job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimatePayload {
    #[serde(rename = "image_b64", with = "crate::codec::base64_bytes")]
    pub image: Vec<u8>,
    pub character_name: String,
    pub params: AnimateParams,
}

// ---------------------------------------------------------------------------
// JobPayload
// ---------------------------------------------------------------------------

/// Kind-specific input stored with the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPayload {
    Static(TransformPayload),
    Temporal(AnimatePayload),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Static(_) => JobKind::Static,
            JobPayload::Temporal(_) => JobKind::Temporal,
        }
    }

    /// Reject payloads the worker would fail on anyway.
    pub fn validate(&self) -> Result<(), CoreError> {
        let (image, name) = match self {
            JobPayload::Static(p) => {
                p.params.validate()?;
                (&p.image, &p.character_name)
            }
            JobPayload::Temporal(p) => {
                p.params.validate()?;
                (&p.image, &p.character_name)
            }
        };
        if image.is_empty() {
            return Err(CoreError::Validation("image must not be empty".into()));
        }
        if name.trim().is_empty() {
            return Err(CoreError::Validation(
                "character_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn transform(params: TransformParams) -> JobPayload {
        JobPayload::Static(TransformPayload {
            image: vec![1, 2, 3],
            character_name: "Subject".into(),
            feature_prompt: String::new(),
            params,
        })
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(transform(TransformParams::default()).validate().is_ok());
        let animate = JobPayload::Temporal(AnimatePayload {
            image: vec![1],
            character_name: "Subject".into(),
            params: AnimateParams::default(),
        });
        assert!(animate.validate().is_ok());
    }

    #[test]
    fn inverted_canny_band_is_rejected() {
        let params = TransformParams {
            canny_low: 200,
            canny_high: 100,
            ..TransformParams::default()
        };
        assert_matches!(transform(params).validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn out_of_range_steps_are_rejected() {
        let params = TransformParams {
            steps: 0,
            ..TransformParams::default()
        };
        assert_matches!(transform(params).validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let nan = TransformParams {
            strength: f32::NAN,
            cfg_scale: f32::NAN,
            ..TransformParams::default()
        };
        assert_matches!(transform(nan).validate(), Err(CoreError::Validation(msg)) if msg.contains("strength"));

        let infinite = TransformParams {
            cn_depth: f32::INFINITY,
            ..TransformParams::default()
        };
        assert_matches!(transform(infinite).validate(), Err(CoreError::Validation(_)));

        let animate = JobPayload::Temporal(AnimatePayload {
            image: vec![1],
            character_name: "Subject".into(),
            params: AnimateParams {
                denoising_strength: f32::NAN,
                ..AnimateParams::default()
            },
        });
        assert_matches!(animate.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_subject_name_is_rejected() {
        let payload = JobPayload::Static(TransformPayload {
            image: vec![1],
            character_name: "   ".into(),
            feature_prompt: String::new(),
            params: TransformParams::default(),
        });
        assert_matches!(payload.validate(), Err(CoreError::Validation(msg)) if msg.contains("character_name"));
    }

    #[test]
    fn effective_steps_scale_with_strength() {
        let params = TransformParams::default();
        assert_eq!(params.effective_steps(), 21);
        let weak = TransformParams {
            strength: 0.0,
            ..TransformParams::default()
        };
        assert_eq!(weak.effective_steps(), 1);
    }

    #[test]
    fn payload_is_tagged_by_kind_with_base64_image() {
        let json = serde_json::to_value(transform(TransformParams::default())).unwrap();
        assert_eq!(json["kind"], "STATIC");
        assert_eq!(json["image_b64"], "AQID");
    }
}
