//! Job orchestrators: one synchronous pipeline per job kind.
//!
//! Everything here blocks and is meant to run on a blocking thread. The
//! engine lease is held only for the generation or animation call, so
//! evaluation and encoding happen outside the residency critical section.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use synthgate_core::capability::{
    AnimationRequest, CapabilityError, ExecutionContext, GenerationRequest, QualityEvaluator,
    SubjectAnalyzer,
};
use synthgate_core::job::JobKind;
use synthgate_core::output::{round_to, AnimationMetrics, JobOutput, TransformMetrics};
use synthgate_core::payload::{AnimatePayload, JobPayload, TransformPayload};
use synthgate_core::progress::{
    ProgressNote, ProgressSink, PHASE_ANIMATING, PHASE_DECODING_INPUT, PHASE_ENCODING_CONTAINER,
    PHASE_FINALIZING, PHASE_INITIALIZING, PHASE_SYNTHESIZING_IMAGE,
};
use synthgate_core::types::JobId;
use synthgate_pipeline::imaging::encode_png;
use tokio_util::sync::CancellationToken;

use crate::residency::{EngineCache, EngineError};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Could not decode input image: {0}")]
    Decode(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Runs STATIC and TEMPORAL jobs against the worker's engine cache.
pub struct Orchestrator {
    engines: Arc<EngineCache>,
    analyzer: Arc<dyn SubjectAnalyzer>,
    evaluator: Arc<dyn QualityEvaluator>,
}

impl Orchestrator {
    pub fn new(
        engines: Arc<EngineCache>,
        analyzer: Arc<dyn SubjectAnalyzer>,
        evaluator: Arc<dyn QualityEvaluator>,
    ) -> Self {
        Self {
            engines,
            analyzer,
            evaluator,
        }
    }

    pub fn engines(&self) -> &EngineCache {
        &self.engines
    }

    /// Dispatch on the payload kind.
    pub fn run(
        &self,
        job_id: JobId,
        payload: &JobPayload,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<JobOutput, JobError> {
        let ctx = ExecutionContext {
            job_id,
            progress,
            cancel,
        };
        match payload {
            JobPayload::Static(p) => self.transform(p, &ctx),
            JobPayload::Temporal(p) => self.animate(p, &ctx),
        }
    }

    /// Decode, generate, evaluate, encode.
    pub fn transform(
        &self,
        payload: &TransformPayload,
        ctx: &ExecutionContext<'_>,
    ) -> Result<JobOutput, JobError> {
        let started = Instant::now();
        enter_phase(ctx, PHASE_INITIALIZING);
        let original = decode(&payload.image)?;

        let generated = {
            let lease = self.engines.ensure(JobKind::Static)?;
            let generator = lease.as_static()?;
            enter_phase(ctx, PHASE_SYNTHESIZING_IMAGE);
            generator.generate(
                &GenerationRequest {
                    image: &original,
                    guidance: &payload.character_name,
                    feature_text: &payload.feature_prompt,
                    params: &payload.params,
                },
                ctx,
            )?
        };

        enter_phase(ctx, PHASE_FINALIZING);
        let report = self.evaluator.evaluate(&original, &generated.image)?;
        let image = encode_png(&generated.image)?;
        ctx.progress.tick(1, 1, None);

        tracing::info!(
            job_id = %ctx.job_id,
            structural = report.structural_score,
            identity = report.identity_score,
            realism = report.realism_score,
            "Transform finished",
        );

        Ok(JobOutput::Static {
            image,
            metrics: TransformMetrics {
                structural_similarity: report.structural_score,
                identity_preservation: report.identity_score,
                textural_realism: report.realism_score,
                inference_time: round_to(started.elapsed().as_secs_f64(), 2),
                full_prompt: generated.positive_prompt,
                negative_prompt: generated.negative_prompt,
            },
        })
    }

    /// Decode, analyze the subject, animate.
    pub fn animate(
        &self,
        payload: &AnimatePayload,
        ctx: &ExecutionContext<'_>,
    ) -> Result<JobOutput, JobError> {
        let started = Instant::now();
        enter_phase(ctx, PHASE_DECODING_INPUT);
        let still = decode(&payload.image)?;
        let subject = self
            .analyzer
            .analyze(&still, &payload.character_name)?
            .into_metadata(&payload.character_name);

        let params = &payload.params;
        let clip = {
            let lease = self.engines.ensure(JobKind::Temporal)?;
            let animator = lease.as_temporal()?;
            enter_phase(ctx, PHASE_ANIMATING);
            animator.animate(
                &AnimationRequest {
                    image: &still,
                    motion_text: &params.motion_prompt,
                    subject: &subject,
                    frame_count: params.duration_frames,
                    fps: params.fps,
                    params,
                },
                ctx,
            )?
        };
        ctx.progress.tick(
            1,
            1,
            Some(ProgressNote::Phase(PHASE_ENCODING_CONTAINER.to_string())),
        );

        tracing::info!(
            job_id = %ctx.job_id,
            frames = clip.frame_count,
            bytes = clip.video.len(),
            "Animation finished",
        );

        Ok(JobOutput::Temporal {
            video: clip.video,
            media_type: clip.media_type,
            metrics: AnimationMetrics {
                inference_time: round_to(started.elapsed().as_secs_f64(), 2),
                total_frames: clip.frame_count,
                fps: clip.fps,
            },
        })
    }
}

fn enter_phase(ctx: &ExecutionContext<'_>, label: &str) {
    ctx.progress
        .tick(0, 1, Some(ProgressNote::Phase(label.to_string())));
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, JobError> {
    image::load_from_memory(bytes).map_err(|e| JobError::Decode(e.to_string()))
}
