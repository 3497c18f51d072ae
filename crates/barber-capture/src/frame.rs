//! Frame type and pixel conversion (BGR to RGB, dark detection).

use image::RgbImage;
use std::time::Instant;

/// Fraction of dark pixels above which a snapshot is considered black.
pub const DARK_FRAME_THRESHOLD: f32 = 0.95;

/// A raw camera frame in packed BGR24 order (3 bytes per pixel).
#[derive(Clone)]
pub struct BgrFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    pub timestamp: Instant,
}

impl std::fmt::Debug for BgrFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BgrFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl BgrFrame {
    /// Wrap a BGR24 buffer, checking it holds `width * height * 3` bytes.
    /// Trailing bytes past the frame (row padding from some drivers) are dropped.
    pub fn new(mut data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self, FrameError> {
        let expected = expected_len(width, height)?;
        if data.len() < expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        data.truncate(expected);
        Ok(Self {
            data,
            width,
            height,
            sequence,
            timestamp: Instant::now(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert to an RGB image.
    pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        let rgb = bgr_to_rgb(&self.data, self.width, self.height)?;
        RgbImage::from_raw(self.width, self.height, rgb).ok_or(FrameError::InvalidLength {
            expected: expected_len(self.width, self.height)?,
            actual: self.data.len(),
        })
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyFrame { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or(FrameError::EmptyFrame { width, height })
}

/// Convert packed BGR24 to packed RGB24 by swapping the first and third byte
/// of every pixel.
pub fn bgr_to_rgb(bgr: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = expected_len(width, height)?;
    if bgr.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: bgr.len(),
        });
    }
    Ok(bgr[..expected]
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect())
}

/// Check if an RGB image is dark: more than `threshold_pct` of its pixels
/// have a luma below 32.
pub fn is_dark_frame(rgb: &RgbImage, threshold_pct: f32) -> bool {
    let total = rgb.width() as usize * rgb.height() as usize;
    if total == 0 {
        return true;
    }
    let dark_count = rgb.pixels().filter(|p| luma(p.0) < 32).count();
    (dark_count as f32 / total as f32) > threshold_pct
}

/// ITU-R BT.601 luma, integer approximation.
fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid BGR length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
}
