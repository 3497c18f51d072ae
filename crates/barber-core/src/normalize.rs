//! Image normalization: fit any bitmap onto a fixed white canvas.
//!
//! The image is scaled down (never up) with its aspect ratio preserved, then
//! pasted centered on a canvas of exactly the requested size. Centering uses
//! integer division, so odd remainders leave the extra pixel on the
//! bottom/right edge.

use crate::types::Canvas;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, Rgb, RgbImage};
use std::path::Path;
use thiserror::Error;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("could not decode image: {0}")]
    Decode(#[from] ImageError),
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Decode an in-memory image payload (JPEG, PNG, ...).
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, NormalizeError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, NormalizeError> {
    let bytes = std::fs::read(path).map_err(|source| NormalizeError::Read {
        path: path.display().to_string(),
        source,
    })?;
    decode(&bytes)
}

/// Size the image takes on the canvas: fit inside, never magnify.
pub fn fitted_size(width: u32, height: u32, canvas: Canvas) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale_w = canvas.width as f64 / width as f64;
    let scale_h = canvas.height as f64 / height as f64;
    let scale = scale_w.min(scale_h).min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }

    let new_w = ((width as f64 * scale).round() as u32).clamp(1, canvas.width);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, canvas.height);
    (new_w, new_h)
}

/// Normalize `image` onto a white canvas of exactly `canvas` size.
pub fn normalize(image: &DynamicImage, canvas: Canvas) -> RgbImage {
    let rgb = image.to_rgb8();
    let (src_w, src_h) = rgb.dimensions();
    let (new_w, new_h) = fitted_size(src_w, src_h, canvas);

    let scaled = if (new_w, new_h) == (src_w, src_h) {
        rgb
    } else {
        imageops::resize(&rgb, new_w, new_h, RESIZE_FILTER)
    };

    let mut out = RgbImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    let offset_x = (canvas.width - new_w) / 2;
    let offset_y = (canvas.height - new_h) / 2;
    imageops::replace(&mut out, &scaled, offset_x as i64, offset_y as i64);

    tracing::trace!(
        src_w,
        src_h,
        new_w,
        new_h,
        offset_x,
        offset_y,
        "normalized image"
    );
    out
}

/// [`normalize`] lifted over an optional image.
pub fn normalize_opt(image: Option<&DynamicImage>, canvas: Canvas) -> Option<RgbImage> {
    image.map(|img| normalize(img, canvas))
}
