//! Small image helpers shared by the reference capabilities.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use synthgate_core::capability::CapabilityError;

/// Latent grid the samplers operate on.
pub const GRID: u32 = 64;

/// Scale `width x height` so the long side equals `anchor`, then round each
/// side to the nearest multiple of [`GRID`] (never below one cell).
pub fn proportional_dimensions(width: u32, height: u32, anchor: u32) -> (u32, u32) {
    let aspect = width as f64 / height.max(1) as f64;
    let (w, h) = if width >= height {
        (anchor as f64, anchor as f64 / aspect)
    } else {
        (anchor as f64 * aspect, anchor as f64)
    };
    (snap_round(w), snap_round(h))
}

fn snap_round(side: f64) -> u32 {
    let cells = (side / GRID as f64).round() as u32;
    cells.max(1) * GRID
}

/// Floor both sides to the grid (never below one cell).
pub fn floor_to_grid(width: u32, height: u32) -> (u32, u32) {
    ((width / GRID).max(1) * GRID, (height / GRID).max(1) * GRID)
}

/// Composite any alpha channel onto white and return plain RGB.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = u16::from(px[3]);
        let blend = |c: u8| -> u8 { ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Encode as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CapabilityError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CapabilityError::Execution(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Mean luma (0..=255) of an image.
pub fn mean_luma(image: &DynamicImage) -> f64 {
    let gray = image.to_luma8();
    let count = (gray.width() as u64 * gray.height() as u64).max(1);
    let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
    sum as f64 / count as f64
}
