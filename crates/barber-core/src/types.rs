use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default canvas edge length in pixels.
pub const DEFAULT_CANVAS_SIZE: u32 = 400;

/// Fixed-size output frame every displayed image is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Build a canvas, replacing a zero dimension with 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE, DEFAULT_CANVAS_SIZE)
    }
}

/// One named, categorized reference to a static style asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEntry {
    pub category: String,
    pub display_name: String,
    /// Asset location: `styles_dir/<file>` from the catalog definition.
    pub asset_path: PathBuf,
}

impl StyleEntry {
    /// `category/display_name`, used in logs and CLI output.
    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.display_name)
    }
}
