//! Capability seams consumed by the job orchestrators.
//!
//! Generation, animation, analysis and evaluation are opaque to the core.
//! All calls are synchronous and may block for a long time; the worker runs
//! them on a blocking thread. Generation and animation live inside an
//! [`Engine`], the heavyweight device-resident object the worker caches.

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::job::JobKind;
use crate::payload::{
    AnimateParams, TransformParams, DEFAULT_CANNY_HIGH, DEFAULT_CANNY_LOW, DEFAULT_CFG_SCALE,
    DEFAULT_CN_DEPTH, DEFAULT_CN_POSE, DEFAULT_STEPS, DEFAULT_STRENGTH,
};
use crate::progress::ProgressSink;
use crate::types::JobId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// Heavyweight setup failed (missing weights, incompatible device).
    #[error("Engine construction failed: {0}")]
    Construction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Per-call context handed to engine capabilities.
pub struct ExecutionContext<'a> {
    pub job_id: JobId,
    pub progress: &'a dyn ProgressSink,
    /// Only triggered on worker shutdown; capabilities should check it
    /// between units of work.
    pub cancel: &'a CancellationToken,
}

impl ExecutionContext<'_> {
    /// `Err(Cancelled)` once the token fired.
    pub fn checkpoint(&self) -> Result<(), CapabilityError> {
        if self.cancel.is_cancelled() {
            return Err(CapabilityError::Cancelled);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generation (STATIC)
// ---------------------------------------------------------------------------

pub struct GenerationRequest<'a> {
    pub image: &'a DynamicImage,
    /// Subject name used as primary guidance.
    pub guidance: &'a str,
    pub feature_text: &'a str,
    pub params: &'a TransformParams,
}

pub struct Generated {
    pub image: DynamicImage,
    pub positive_prompt: String,
    pub negative_prompt: String,
}

pub trait ImageGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Generated, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Animation (TEMPORAL)
// ---------------------------------------------------------------------------

/// Identity anchor injected into an animation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectMetadata {
    pub name: String,
    pub prompt_base: String,
    pub negative_prompt: String,
    /// Conditioning weights recommended by the analyzer for this subject.
    pub weights: RecommendedWeights,
}

pub struct AnimationRequest<'a> {
    pub image: &'a DynamicImage,
    pub motion_text: &'a str,
    pub subject: &'a SubjectMetadata,
    pub frame_count: u32,
    pub fps: u32,
    pub params: &'a AnimateParams,
}

pub struct Animation {
    pub video: Vec<u8>,
    /// MIME type of `video`.
    pub media_type: String,
    pub frame_count: u32,
    pub fps: u32,
}

pub trait VideoAnimator: Send + Sync {
    fn animate(
        &self,
        request: &AnimationRequest<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Animation, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Recommended conditioning weights for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedWeights {
    pub steps: u32,
    pub cfg_scale: f32,
    pub cn_depth: f32,
    pub cn_pose: f32,
    pub strength: f32,
    pub canny_low: u32,
    pub canny_high: u32,
}

impl Default for RecommendedWeights {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            cfg_scale: DEFAULT_CFG_SCALE,
            cn_depth: DEFAULT_CN_DEPTH,
            cn_pose: DEFAULT_CN_POSE,
            strength: DEFAULT_STRENGTH,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAnalysis {
    pub detected_essence: String,
    /// Ordered, de-duplicated prompt fragments.
    pub prompt_fragments: Vec<String>,
    pub negative_prompt: String,
    pub weights: RecommendedWeights,
}

impl SubjectAnalysis {
    pub fn suggested_prompt(&self) -> String {
        self.prompt_fragments.join(", ")
    }

    pub fn into_metadata(self, name: &str) -> SubjectMetadata {
        SubjectMetadata {
            name: name.to_string(),
            prompt_base: self.suggested_prompt(),
            negative_prompt: self.negative_prompt,
            weights: self.weights,
        }
    }
}

pub trait SubjectAnalyzer: Send + Sync {
    fn analyze(
        &self,
        image: &DynamicImage,
        subject_name: &str,
    ) -> Result<SubjectAnalysis, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub structural_score: f64,
    pub identity_score: f64,
    pub realism_score: f64,
}

pub trait QualityEvaluator: Send + Sync {
    fn evaluate(
        &self,
        original: &DynamicImage,
        generated: &DynamicImage,
    ) -> Result<QualityReport, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Engines
// ---------------------------------------------------------------------------

/// A constructed, device-resident capability of one kind.
pub enum Engine {
    Static(Box<dyn ImageGenerator>),
    Temporal(Box<dyn VideoAnimator>),
}

impl Engine {
    pub fn kind(&self) -> JobKind {
        match self {
            Engine::Static(_) => JobKind::Static,
            Engine::Temporal(_) => JobKind::Temporal,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Engine").field(&self.kind()).finish()
    }
}

/// Builds engines and reclaims device memory after one is dropped.
pub trait EngineFactory: Send + Sync {
    fn build(&self, kind: JobKind) -> Result<Engine, CapabilityError>;

    /// Run a full reclaim cycle: finalize deferred resources and hand pooled
    /// device memory back to the allocator. Called after the resident engine
    /// has been dropped and before the next one is built.
    fn reclaim(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keeps_analysis_weights() {
        let weights = RecommendedWeights {
            cn_pose: 0.9,
            strength: 0.35,
            ..RecommendedWeights::default()
        };
        let analysis = SubjectAnalysis {
            detected_essence: "tall figure".into(),
            prompt_fragments: vec!["tall figure".into(), "red coat".into()],
            negative_prompt: "blurry".into(),
            weights: weights.clone(),
        };

        let meta = analysis.into_metadata("Ada");

        assert_eq!(meta.name, "Ada");
        assert_eq!(meta.prompt_base, "tall figure, red coat");
        assert_eq!(meta.negative_prompt, "blurry");
        assert_eq!(meta.weights, weights);
    }

    #[test]
    fn default_metadata_uses_default_weights() {
        let meta = SubjectMetadata::default();
        assert_eq!(meta.weights.steps, DEFAULT_STEPS);
        assert_eq!(meta.weights.cn_pose, DEFAULT_CN_POSE);
    }
}
