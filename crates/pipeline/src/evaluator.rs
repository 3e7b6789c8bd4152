//! Histogram and gradient based quality evaluator.
//!
//! Both images are normalized to a 512x512 RGB grid first.
//!
//! - structural: correlation of Sobel magnitude maps downsampled to 256x256
//! - identity: hue histogram correlation mapped from `-1..=1` to `0..=1`
//! - realism: Shannon entropy of the generated luma over the original's

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use synthgate_core::capability::{CapabilityError, QualityEvaluator, QualityReport};
use synthgate_core::output::round_to;

const EVAL_SIZE: u32 = 512;
const EDGE_GRID: u32 = 256;
const HUE_BINS: usize = 180;

#[derive(Debug, Default)]
pub struct HistogramEvaluator;

impl HistogramEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl QualityEvaluator for HistogramEvaluator {
    fn evaluate(
        &self,
        original: &DynamicImage,
        generated: &DynamicImage,
    ) -> Result<QualityReport, CapabilityError> {
        let src = normalize(original);
        let gen = normalize(generated);

        let structural = edge_correlation(&src, &gen).max(0.0);
        let identity = (pearson(&hue_histogram(&src), &hue_histogram(&gen)) + 1.0) / 2.0;

        let src_entropy = luma_entropy(&DynamicImage::ImageRgb8(src).to_luma8());
        let gen_entropy = luma_entropy(&DynamicImage::ImageRgb8(gen).to_luma8());
        let realism = gen_entropy / src_entropy.max(1e-6);

        Ok(QualityReport {
            structural_score: round_to(structural, 4),
            identity_score: round_to(identity, 4),
            realism_score: round_to(realism, 4),
        })
    }
}

fn normalize(image: &DynamicImage) -> RgbImage {
    image
        .resize_exact(EVAL_SIZE, EVAL_SIZE, FilterType::Lanczos3)
        .to_rgb8()
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

fn sobel_magnitude(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let at = |x: i64, y: i64| -> f64 {
        let cx = x.clamp(0, w as i64 - 1) as u32;
        let cy = y.clamp(0, h as i64 - 1) as u32;
        f64::from(gray.get_pixel(cx, cy)[0])
    };
    GrayImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
            - at(x - 1, y - 1)
            - 2.0 * at(x - 1, y)
            - at(x - 1, y + 1);
        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
            - at(x - 1, y - 1)
            - 2.0 * at(x, y - 1)
            - at(x + 1, y - 1);
        image::Luma([(gx.hypot(gy) / 4.0).min(255.0) as u8])
    })
}

fn edge_correlation(src: &RgbImage, gen: &RgbImage) -> f64 {
    let edges = |rgb: &RgbImage| -> Vec<f64> {
        let gray = DynamicImage::ImageRgb8(rgb.clone()).to_luma8();
        let magnitude = DynamicImage::ImageLuma8(sobel_magnitude(&gray));
        magnitude
            .resize_exact(EDGE_GRID, EDGE_GRID, FilterType::Triangle)
            .to_luma8()
            .pixels()
            .map(|p| f64::from(p[0]))
            .collect()
    };
    pearson(&edges(src), &edges(gen))
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Hue in `0..180` (half degrees), matching the usual 8-bit HSV layout.
fn hue(r: u8, g: u8, b: u8) -> usize {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0.0 {
        return 0;
    }
    let degrees = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    ((degrees / 2.0) as usize).min(HUE_BINS - 1)
}

/// Min-max normalized hue histogram.
fn hue_histogram(rgb: &RgbImage) -> Vec<f64> {
    let mut bins = vec![0.0; HUE_BINS];
    for px in rgb.pixels() {
        bins[hue(px[0], px[1], px[2])] += 1.0;
    }
    let max = bins.iter().cloned().fold(f64::MIN, f64::max);
    let min = bins.iter().cloned().fold(f64::MAX, f64::min);
    let span = max - min;
    if span > 0.0 {
        for b in bins.iter_mut() {
            *b = (*b - min) / span;
        }
    }
    bins
}

// ---------------------------------------------------------------------------
// Information
// ---------------------------------------------------------------------------

/// Shannon entropy of a luma image scaled to `0..=1`.
fn luma_entropy(gray: &GrayImage) -> f64 {
    let mut counts = [0u64; 256];
    for px in gray.pixels() {
        counts[px[0] as usize] += 1;
    }
    let total = (gray.width() as u64 * gray.height() as u64).max(1) as f64;
    let bits: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    bits / 8.0
}

/// Pearson correlation. Two constant series correlate perfectly if equal.
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let (da, db) = (a[i] - mean_a, b[i] - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return if a[..n] == b[..n] { 1.0 } else { 0.0 };
    }
    (cov / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(96, 64, |x, y| {
            Rgb([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn identical_images_score_at_the_top() {
        let img = gradient();
        let report = HistogramEvaluator::new().evaluate(&img, &img).unwrap();
        assert_eq!(report.structural_score, 1.0);
        assert_eq!(report.identity_score, 1.0);
        assert_eq!(report.realism_score, 1.0);
    }

    #[test]
    fn flat_output_loses_structure_and_entropy() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(96, 64, Rgb([128, 128, 128])));
        let report = HistogramEvaluator::new().evaluate(&gradient(), &flat).unwrap();
        assert!(report.structural_score < 0.5);
        assert!(report.realism_score < 0.1);
    }

    #[test]
    fn hue_wheel_lands_in_expected_bins() {
        assert_eq!(hue(255, 0, 0), 0);
        assert_eq!(hue(0, 255, 0), 60);
        assert_eq!(hue(0, 0, 255), 120);
        assert_eq!(hue(40, 40, 40), 0);
    }

    #[test]
    fn pearson_handles_constant_series() {
        assert_eq!(pearson(&[1.0, 1.0], &[1.0, 1.0]), 1.0);
        assert_eq!(pearson(&[1.0, 1.0], &[1.0, 2.0]), 0.0);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-9);
    }
}
