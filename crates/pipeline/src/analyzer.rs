//! Reference subject analyzer backed by a JSON knowledge base.
//!
//! Each `*.json` file in the metadata directory describes one subject
//! profile; a profile matches when any of its `aliases` occurs in the
//! lower-cased subject name. Unmatched subjects fall back to the default
//! profile (`default.json` if present, otherwise a built-in baseline).
//! Lighting fragments are picked from simple luma heuristics.

use std::collections::HashSet;
use std::path::Path;

use image::DynamicImage;
use serde::Deserialize;
use synthgate_core::capability::{
    CapabilityError, RecommendedWeights, SubjectAnalysis, SubjectAnalyzer,
};
use synthgate_core::payload::{
    DEFAULT_CANNY_HIGH, DEFAULT_CANNY_LOW, DEFAULT_CFG_SCALE, DEFAULT_STEPS,
};

use crate::imaging::mean_luma;

/// Prompt token budget after de-duplication.
const MAX_PROMPT_TOKENS: usize = 70;

/// Below this mean alpha the subject is cut out on a void.
const VOID_ALPHA_MEAN: f64 = 20.0;

/// Below this mean luma the background is treated as studio black.
const VOID_LUMA_MEAN: f64 = 25.0;

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileWeights {
    #[serde(default = "default_depth")]
    pub depth: f32,
    #[serde(default = "default_pose")]
    pub openpose: f32,
}

fn default_depth() -> f32 {
    0.75
}

fn default_pose() -> f32 {
    0.40
}

/// One subject entry in the knowledge base.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectProfile {
    #[serde(default)]
    pub aliases: Vec<String>,
    pub essence: Option<String>,
    pub prompt_base: Option<String>,
    pub weights: Option<ProfileWeights>,
    pub denoising_strength: Option<f32>,
    pub negative_prompt: Option<String>,
    pub realism_fragments: Option<Vec<String>>,
}

impl SubjectProfile {
    fn baseline() -> Self {
        Self {
            aliases: Vec::new(),
            essence: Some("unknown_entity".into()),
            prompt_base: Some("cinematic portrait, realistic features".into()),
            weights: Some(ProfileWeights {
                depth: 0.75,
                openpose: 0.45,
            }),
            denoising_strength: Some(0.70),
            negative_prompt: Some("anime, cartoon, drawing, plastic, low quality".into()),
            realism_fragments: Some(vec!["hyper-realistic, 8k, detailed skin texture".into()]),
        }
    }

    /// Fields set on `overlay` win; everything else is inherited.
    fn merged_with(&self, overlay: &SubjectProfile) -> SubjectProfile {
        SubjectProfile {
            aliases: overlay.aliases.clone(),
            essence: overlay.essence.clone().or_else(|| self.essence.clone()),
            prompt_base: overlay.prompt_base.clone().or_else(|| self.prompt_base.clone()),
            weights: overlay.weights.clone().or_else(|| self.weights.clone()),
            denoising_strength: overlay.denoising_strength.or(self.denoising_strength),
            negative_prompt: overlay
                .negative_prompt
                .clone()
                .or_else(|| self.negative_prompt.clone()),
            realism_fragments: overlay
                .realism_fragments
                .clone()
                .or_else(|| self.realism_fragments.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetadataAnalyzer {
    default_profile: SubjectProfile,
    profiles: Vec<SubjectProfile>,
}

impl Default for MetadataAnalyzer {
    fn default() -> Self {
        Self::new(SubjectProfile::baseline(), Vec::new())
    }
}

impl MetadataAnalyzer {
    pub fn new(default_profile: SubjectProfile, profiles: Vec<SubjectProfile>) -> Self {
        Self {
            default_profile,
            profiles,
        }
    }

    /// Load every profile in `dir`. Unreadable files are skipped with a warning.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut default_profile = SubjectProfile::baseline();
        let mut profiles = Vec::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| {
                    serde_json::from_str::<SubjectProfile>(&text).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(profile) if path.file_stem().is_some_and(|s| s == "default") => {
                    default_profile = SubjectProfile::baseline().merged_with(&profile);
                }
                Ok(profile) => profiles.push(profile),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "Skipping unreadable subject profile");
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            profiles = profiles.len(),
            "Subject knowledge base loaded",
        );
        Ok(Self::new(default_profile, profiles))
    }

    /// Default profile merged with the first profile whose alias matches.
    fn resolve(&self, subject_name: &str) -> SubjectProfile {
        let query = subject_name.to_lowercase();
        self.profiles
            .iter()
            .find(|p| {
                p.aliases
                    .iter()
                    .any(|alias| !alias.is_empty() && query.contains(&alias.to_lowercase()))
            })
            .map(|p| self.default_profile.merged_with(p))
            .unwrap_or_else(|| self.default_profile.clone())
    }
}

/// True when the subject sits on a void (transparent or black) backdrop.
fn preserves_background(image: &DynamicImage) -> bool {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        let count = (rgba.width() as u64 * rgba.height() as u64).max(1);
        let alpha_sum: u64 = rgba.pixels().map(|p| u64::from(p[3])).sum();
        if (alpha_sum as f64 / count as f64) < VOID_ALPHA_MEAN {
            return true;
        }
    }
    mean_luma(image) < VOID_LUMA_MEAN
}

fn lighting_fragment(preserve: bool, brightness: f64) -> &'static str {
    if preserve {
        if brightness < 60.0 {
            "dramatic rim lighting, high contrast, pure black background, cinematic shadows"
        } else {
            "ambient cinematic lighting, high-fidelity studio environment"
        }
    } else if brightness < 80.0 {
        "dramatic chiaroscuro lighting, deep shadows, rim light"
    } else if brightness > 180.0 {
        "soft studio lighting, professional high-key photography"
    } else {
        "cinematic film lighting"
    }
}

/// Split comma-separated fragments into unique lower-cased tokens.
fn dedupe_tokens<'a>(fragments: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for fragment in fragments {
        for word in fragment.split(',') {
            let token = word.trim().to_lowercase();
            if !token.is_empty() && seen.insert(token.clone()) {
                tokens.push(token);
            }
        }
    }
    tokens.truncate(limit);
    tokens
}

impl SubjectAnalyzer for MetadataAnalyzer {
    fn analyze(
        &self,
        image: &DynamicImage,
        subject_name: &str,
    ) -> Result<SubjectAnalysis, CapabilityError> {
        let profile = self.resolve(subject_name);
        let preserve = preserves_background(image);
        let lighting = lighting_fragment(preserve, mean_luma(image));

        let prompt_base = profile.prompt_base.clone().unwrap_or_default();
        let realism = profile.realism_fragments.clone().unwrap_or_default();
        let fragments = std::iter::once(prompt_base.as_str())
            .chain(realism.iter().map(String::as_str))
            .chain(std::iter::once(lighting));
        let prompt_fragments = dedupe_tokens(fragments, MAX_PROMPT_TOKENS);

        let weights = profile.weights.clone().unwrap_or(ProfileWeights {
            depth: default_depth(),
            openpose: default_pose(),
        });

        Ok(SubjectAnalysis {
            detected_essence: profile
                .essence
                .clone()
                .unwrap_or_else(|| "unknown".into())
                .to_uppercase(),
            prompt_fragments,
            negative_prompt: profile.negative_prompt.clone().unwrap_or_default(),
            weights: RecommendedWeights {
                steps: DEFAULT_STEPS,
                cfg_scale: DEFAULT_CFG_SCALE,
                cn_depth: weights.depth,
                cn_pose: weights.openpose,
                strength: profile.denoising_strength.unwrap_or(0.70),
                canny_low: DEFAULT_CANNY_LOW,
                canny_high: DEFAULT_CANNY_HIGH,
            },
        })
    }
}
