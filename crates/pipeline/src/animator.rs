//! Reference clip animator.
//!
//! Produces a looping "breathing" clip from one still: frames are brightness
//! modulations of the grid-aligned source, encoded as an animated GIF.
//! The subject's recommended pose weight damps the swing, so a strongly
//! anchored subject moves less. Reports `GENERATING_LATENTS` once, then one `ENCODING_VIDEO_FRAMES` tick
//! per encoded frame.

use std::f32::consts::TAU;

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, DynamicImage, Frame};
use synthgate_core::capability::{
    Animation, AnimationRequest, CapabilityError, ExecutionContext, RecommendedWeights,
    VideoAnimator,
};
use synthgate_core::progress::{
    ProgressNote, PHASE_ENCODING_VIDEO_FRAMES, PHASE_GENERATING_LATENTS,
};

use crate::imaging::{flatten_onto_white, floor_to_grid};

pub const GIF_MEDIA_TYPE: &str = "image/gif";

/// Peak brightness swing at `motion_bucket = 255`.
const MAX_SWING: f32 = 40.0;

#[derive(Debug, Default)]
pub struct ReferenceAnimator;

impl ReferenceAnimator {
    pub fn new() -> Self {
        Self
    }

    /// Prompt a temporal backend would receive for this request.
    pub fn compose_prompt(request: &AnimationRequest<'_>) -> String {
        let mut parts = vec!["photorealistic cinematic video".to_string()];
        for part in [request.subject.prompt_base.trim(), request.motion_text.trim()] {
            if !part.is_empty() {
                parts.push(part.to_string());
            }
        }
        parts.push("high quality, natural light".to_string());
        parts.join(", ")
    }

    /// Brightness amplitude for a motion bucket under the subject's weights.
    /// `cn_pose` in `0..=2` scales the swing from full down to none.
    pub fn motion_swing(motion_bucket: u32, weights: &RecommendedWeights) -> f32 {
        let motion = motion_bucket.min(255) as f32 / 255.0;
        let anchor = (1.0 - weights.cn_pose / 2.0).clamp(0.0, 1.0);
        MAX_SWING * motion * anchor
    }
}

impl VideoAnimator for ReferenceAnimator {
    fn animate(
        &self,
        request: &AnimationRequest<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Animation, CapabilityError> {
        if request.frame_count == 0 || request.fps == 0 {
            return Err(CapabilityError::InvalidInput(
                "frame_count and fps must be positive".into(),
            ));
        }
        let total = request.frame_count;
        let (w, h) = floor_to_grid(request.image.width(), request.image.height());
        let base = DynamicImage::ImageRgb8(flatten_onto_white(request.image))
            .resize_exact(w, h, FilterType::Lanczos3);

        ctx.progress.tick(
            0,
            total,
            Some(ProgressNote::Phase(PHASE_GENERATING_LATENTS.to_string())),
        );
        tracing::debug!(
            job_id = %ctx.job_id,
            prompt = %Self::compose_prompt(request),
            frames = total,
            cn_pose = request.subject.weights.cn_pose,
            strength = request.subject.weights.strength,
            "Reference animation started",
        );

        let swing = Self::motion_swing(request.params.motion_bucket, &request.subject.weights);
        let delay = Delay::from_numer_denom_ms(1000, request.fps);

        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| CapabilityError::Execution(format!("GIF setup failed: {e}")))?;

            for i in 0..total {
                ctx.checkpoint()?;
                let phase = TAU * i as f32 / total as f32;
                let frame = base.brighten((swing * phase.sin()).round() as i32).to_rgba8();
                encoder
                    .encode_frame(Frame::from_parts(frame, 0, 0, delay))
                    .map_err(|e| CapabilityError::Execution(format!("GIF encode failed: {e}")))?;
                ctx.progress.tick(
                    i + 1,
                    total,
                    Some(ProgressNote::Phase(PHASE_ENCODING_VIDEO_FRAMES.to_string())),
                );
            }
        }

        Ok(Animation {
            video: buf,
            media_type: GIF_MEDIA_TYPE.to_string(),
            frame_count: total,
            fps: request.fps,
        })
    }
}
