//! Reference still-image generator.
//!
//! Stands in for a diffusion pipeline: conditions the input onto the latent
//! grid, walks the effective sampler steps reporting one tick each, and
//! produces a deterministic tonal remap of the source. Prompt assembly
//! matches what a real backend would receive.

use image::imageops::FilterType;
use image::DynamicImage;
use synthgate_core::capability::{
    CapabilityError, ExecutionContext, GenerationRequest, Generated, ImageGenerator,
};
use synthgate_core::progress::ProgressNote;

use crate::imaging::{encode_png, flatten_onto_white, proportional_dimensions};

/// A preview thumbnail is attached every this many steps.
const PREVIEW_EVERY: u32 = 10;

/// Long side of preview thumbnails.
const PREVIEW_SIZE: u32 = 128;

#[derive(Debug, Default)]
pub struct ReferenceGenerator;

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Positive prompt sent to the sampler.
    pub fn compose_prompt(guidance: &str, feature_text: &str) -> String {
        let mut parts = vec!["photorealistic cinematic photo".to_string()];
        for part in [guidance.trim(), feature_text.trim()] {
            if !part.is_empty() {
                parts.push(part.to_string());
            }
        }
        parts.push("highly detailed, 8k, realistic lighting".to_string());
        parts.join(", ")
    }
}

impl ImageGenerator for ReferenceGenerator {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<Generated, CapabilityError> {
        let params = request.params;
        let (w, h) = proportional_dimensions(
            request.image.width(),
            request.image.height(),
            params.resolution_anchor,
        );
        let conditioned =
            DynamicImage::ImageRgb8(flatten_onto_white(request.image)).resize_exact(w, h, FilterType::Lanczos3);

        let steps = params.effective_steps();
        let mut canvas = conditioned.clone();
        for step in 1..=steps {
            ctx.checkpoint()?;
            // Blend one step's worth toward the inverted target.
            let weight = step as f32 / steps as f32;
            canvas = blend_toward_inverse(&conditioned, weight * params.strength.max(0.05));

            let note = if step % PREVIEW_EVERY == 0 {
                let thumb = canvas.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE);
                encode_png(&thumb).ok().map(ProgressNote::Preview)
            } else {
                None
            };
            ctx.progress.tick(step, steps, note);
        }

        tracing::debug!(job_id = %ctx.job_id, width = w, height = h, steps, "Reference generation finished");

        Ok(Generated {
            image: canvas,
            positive_prompt: Self::compose_prompt(request.guidance, request.feature_text),
            negative_prompt: params.negative_prompt.clone(),
        })
    }
}

/// Linear blend between `source` and its colour inverse; `t` in 0..=1.
fn blend_toward_inverse(source: &DynamicImage, t: f32) -> DynamicImage {
    let t = t.clamp(0.0, 1.0);
    let mut rgb = source.to_rgb8();
    for px in rgb.pixels_mut() {
        for c in px.0.iter_mut() {
            let original = f32::from(*c);
            let inverse = 255.0 - original;
            *c = (original + (inverse - original) * t).round() as u8;
        }
    }
    DynamicImage::ImageRgb8(rgb)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use image::{Rgb, RgbImage};
    use synthgate_core::payload::TransformParams;
    use synthgate_core::progress::ProgressSink;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u32, u32, bool)>>);

    impl ProgressSink for Recorder {
        fn tick(&self, current: u32, total: u32, note: Option<ProgressNote>) {
            let preview = matches!(note, Some(ProgressNote::Preview(_)));
            self.0.lock().unwrap().push((current, total, preview));
        }
    }

    fn source() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([200, 100, 0])))
    }

    #[test]
    fn ticks_once_per_effective_step() {
        let image = source();
        let params = TransformParams::default();
        let recorder = Recorder::default();
        let cancel = CancellationToken::new();
        let ctx = ExecutionContext {
            job_id: uuid::Uuid::now_v7(),
            progress: &recorder,
            cancel: &cancel,
        };
        let request = GenerationRequest {
            image: &image,
            guidance: "Subject",
            feature_text: "red coat",
            params: &params,
        };

        let out = ReferenceGenerator::new().generate(&request, &ctx).unwrap();

        let ticks = recorder.0.lock().unwrap();
        assert_eq!(ticks.len() as u32, params.effective_steps());
        assert_eq!(ticks.last().unwrap().0, ticks.last().unwrap().1);
        assert!(ticks.iter().any(|t| t.2), "expected at least one preview");
        assert_eq!((out.image.width(), out.image.height()), (512, 256));
        assert!(out.positive_prompt.contains("Subject, red coat"));
        assert_eq!(out.negative_prompt, params.negative_prompt);
    }

    #[test]
    fn cancelled_token_stops_generation() {
        let image = source();
        let params = TransformParams::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = ExecutionContext {
            job_id: uuid::Uuid::now_v7(),
            progress: &synthgate_core::progress::NoopSink,
            cancel: &cancel,
        };
        let request = GenerationRequest {
            image: &image,
            guidance: "Subject",
            feature_text: "",
            params: &params,
        };
        assert!(matches!(
            ReferenceGenerator::new().generate(&request, &ctx),
            Err(CapabilityError::Cancelled)
        ));
    }

    #[test]
    fn prompt_skips_empty_fragments() {
        assert_eq!(
            ReferenceGenerator::compose_prompt("Subject", "  "),
            "photorealistic cinematic photo, Subject, highly detailed, 8k, realistic lighting"
        );
    }
}
