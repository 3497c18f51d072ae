use crate::SwapError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;

const MAX_INTENSITY: u8 = 100;

/// Tuning knobs forwarded to the remote model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    /// Swap strength, 0–100.
    pub intensity: u8,
    /// Advanced blending strength, 0–100.
    pub advanced_intensity: u8,
    /// Extra option labels, in order.
    pub settings: Vec<String>,
}

impl Default for SwapParams {
    fn default() -> Self {
        Self {
            intensity: MAX_INTENSITY,
            advanced_intensity: MAX_INTENSITY,
            settings: Vec::new(),
        }
    }
}

impl SwapParams {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.intensity > MAX_INTENSITY {
            return Err(SwapError::InvalidRequest(format!(
                "intensity must be 0-{MAX_INTENSITY}, got {}",
                self.intensity
            )));
        }
        if self.advanced_intensity > MAX_INTENSITY {
            return Err(SwapError::InvalidRequest(format!(
                "advanced intensity must be 0-{MAX_INTENSITY}, got {}",
                self.advanced_intensity
            )));
        }
        Ok(())
    }
}

/// One swap: put the face in `source_path` onto the hairstyle in `target_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub params: SwapParams,
}

/// Request/response boundary to the face-swap model.
pub trait FaceSwapClient {
    /// Run one swap and return the composited image.
    fn swap(
        &self,
        request: &SwapRequest,
    ) -> impl Future<Output = Result<DynamicImage, SwapError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_full_intensity() {
        let params = SwapParams::default();
        assert_eq!(params.intensity, 100);
        assert_eq!(params.advanced_intensity, 100);
        assert!(params.settings.is_empty());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let params = SwapParams {
            advanced_intensity: 101,
            ..SwapParams::default()
        };
        assert!(matches!(params.validate(), Err(SwapError::InvalidRequest(_))));
    }
}
