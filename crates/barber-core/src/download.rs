use crate::store::{self, ImageEncoding, StoreError};
use image::RgbImage;

const DOWNLOAD_PREFIX: &str = "novo_visual_";

/// A result image ready to hand to the user as a file download.
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    /// `novo_visual_<8 hex chars>.<ext>`
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl DownloadArtifact {
    /// Encode `image` and give it a fresh download name.
    pub fn from_image(image: &RgbImage, encoding: ImageEncoding) -> Result<Self, StoreError> {
        let bytes = store::encode(image, encoding)?;
        Ok(Self {
            file_name: download_file_name(encoding),
            mime: encoding.mime(),
            bytes,
        })
    }
}

/// Generate a download file name with an 8-character random hex tag.
pub fn download_file_name(encoding: ImageEncoding) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{DOWNLOAD_PREFIX}{}.{}", &id[..8], encoding.extension())
}
