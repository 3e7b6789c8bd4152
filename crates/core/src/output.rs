//! Kind-specific job results returned by `GET /result/{task_id}`.

use serde::{Deserialize, Serialize};

/// Quality and latency record attached to a still-image transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMetrics {
    pub structural_similarity: f64,
    pub identity_preservation: f64,
    pub textural_realism: f64,
    /// Wall-clock seconds spent in generation and evaluation.
    pub inference_time: f64,
    pub full_prompt: String,
    pub negative_prompt: String,
}

/// Latency record attached to an animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationMetrics {
    pub inference_time: f64,
    pub total_frames: u32,
    pub fps: u32,
}

/// Output of a job that reached `SUCCESS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Static {
        #[serde(rename = "result_image_b64", with = "crate::codec::base64_bytes")]
        image: Vec<u8>,
        metrics: TransformMetrics,
    },
    Temporal {
        #[serde(rename = "video_b64", with = "crate::codec::base64_bytes")]
        video: Vec<u8>,
        media_type: String,
        metrics: AnimationMetrics,
    },
}

/// Round to a fixed number of decimals for reporting.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_output_uses_result_image_field() {
        let output = JobOutput::Static {
            image: b"png".to_vec(),
            metrics: TransformMetrics {
                structural_similarity: 0.5,
                identity_preservation: 0.5,
                textural_realism: 1.0,
                inference_time: 1.25,
                full_prompt: "p".into(),
                negative_prompt: "n".into(),
            },
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["result_image_b64"], "cG5n");
        assert_eq!(json["metrics"]["inference_time"], 1.25);

        let back: JobOutput = serde_json::from_value(json).unwrap();
        assert!(matches!(back, JobOutput::Static { .. }));
    }

    #[test]
    fn temporal_output_deserializes_to_temporal_variant() {
        let json = serde_json::json!({
            "video_b64": "R0lG",
            "media_type": "image/gif",
            "metrics": { "inference_time": 2.0, "total_frames": 24, "fps": 8 }
        });
        let output: JobOutput = serde_json::from_value(json).unwrap();
        assert!(matches!(output, JobOutput::Temporal { ref media_type, .. } if media_type == "image/gif"));
    }

    #[test]
    fn rounding_keeps_requested_precision() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.987654, 4), 0.9877);
    }
}
