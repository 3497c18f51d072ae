//! Uploaded photo payloads and their type check.

use crate::SessionError;
use image::ImageFormat;
use std::path::Path;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// A photo as received from the user.
#[derive(Debug, Clone)]
pub struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a local file as an upload, keeping its name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let upload = Self::new(bytes);
        Ok(match path.file_name() {
            Some(name) => upload.with_file_name(name.to_string_lossy()),
            None => upload,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Accept only JPEG/PNG: by name, by declared type, and by content.
    pub fn validate(&self) -> Result<ImageFormat, SessionError> {
        if let Some(name) = &self.file_name {
            let ext = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(SessionError::Validation(format!(
                    "{name} does not have a .jpg, .jpeg or .png extension"
                )));
            }
        }

        if let Some(content_type) = &self.content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
                return Err(SessionError::Validation(format!(
                    "content type {content_type} is not accepted"
                )));
            }
        }

        match image::guess_format(&self.bytes) {
            Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => Ok(format),
            Ok(other) => Err(SessionError::Validation(format!(
                "{other:?} images are not accepted"
            ))),
            Err(_) => Err(SessionError::Validation(
                "the file is not a recognizable image".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
    const GIF_MAGIC: &[u8] = b"GIF89a\x01\0\x01\0";

    #[test]
    fn test_accepts_jpeg_and_png() {
        let jpg = Upload::new(JPEG_MAGIC.to_vec())
            .with_file_name("me.JPG")
            .with_content_type("image/jpeg");
        assert_eq!(jpg.validate().unwrap(), ImageFormat::Jpeg);

        let png = Upload::new(PNG_MAGIC.to_vec()).with_file_name("me.png");
        assert_eq!(png.validate().unwrap(), ImageFormat::Png);

        let jpeg_alias = Upload::new(JPEG_MAGIC.to_vec()).with_content_type("image/jpg");
        assert!(jpeg_alias.validate().is_ok());
    }

    #[test]
    fn test_rejects_other_extension() {
        let upload = Upload::new(PNG_MAGIC.to_vec()).with_file_name("me.webp");
        assert!(matches!(upload.validate(), Err(SessionError::Validation(_))));
    }

    #[test]
    fn test_rejects_other_content_type() {
        let upload = Upload::new(PNG_MAGIC.to_vec()).with_content_type("image/gif");
        assert!(matches!(upload.validate(), Err(SessionError::Validation(_))));
    }

    #[test]
    fn test_rejects_disguised_payload() {
        let upload = Upload::new(GIF_MAGIC.to_vec()).with_file_name("me.png");
        assert!(matches!(upload.validate(), Err(SessionError::Validation(_))));

        let garbage = Upload::new(b"hello".to_vec());
        assert!(matches!(garbage.validate(), Err(SessionError::Validation(_))));
    }

    #[test]
    fn test_content_type_parameters_are_ignored() {
        let upload = Upload::new(JPEG_MAGIC.to_vec()).with_content_type("image/jpeg; charset=binary");
        assert!(upload.validate().is_ok());
    }
}
