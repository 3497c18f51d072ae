//! Ephemeral image store: materialize images as uniquely named temp files.
//!
//! Every `materialize` call creates a new file; the store remembers each
//! path it handed out until `release` is called for it. Outstanding files
//! are removed when the store is dropped. A crash before that leaks them.

use image::{ImageFormat, RgbImage};
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const TEMP_PREFIX: &str = "barber-";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write temp image in {dir}: {source}")]
    Create {
        dir: String,
        source: std::io::Error,
    },
    #[error("failed to encode image as {format:?}: {source}")]
    Encode {
        format: ImageEncoding,
        source: image::ImageError,
    },
    #[error("failed to remove temp image {path}: {source}")]
    Remove {
        path: String,
        source: std::io::Error,
    },
}

/// File encoding used when materializing an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    #[default]
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

/// Encode an RGB image into an in-memory buffer.
pub fn encode(image: &RgbImage, encoding: ImageEncoding) -> Result<Vec<u8>, StoreError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, encoding.format())
        .map_err(|source| StoreError::Encode {
            format: encoding,
            source,
        })?;
    Ok(buf.into_inner())
}

/// Tracks temp files created for a single session.
#[derive(Debug)]
pub struct EphemeralStore {
    dir: PathBuf,
    outstanding: BTreeSet<PathBuf>,
}

impl EphemeralStore {
    /// Store writing into `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            outstanding: BTreeSet::new(),
        }
    }

    /// Store writing into the system temp directory.
    pub fn in_system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `image` to a new, uniquely named file and return its absolute path.
    ///
    /// The caller owns the path and must hand it back to [`release`](Self::release)
    /// once the image is superseded.
    pub fn materialize(
        &mut self,
        image: &RgbImage,
        encoding: ImageEncoding,
    ) -> Result<PathBuf, StoreError> {
        let bytes = encode(image, encoding)?;
        let create_err = |source| StoreError::Create {
            dir: self.dir.display().to_string(),
            source,
        };

        let suffix = format!(".{}", encoding.extension());
        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(create_err)?;
        file.write_all(&bytes).map_err(create_err)?;
        file.flush().map_err(create_err)?;

        // Keep the file on disk past the handle; cleanup is ours now.
        let (_, path) = file.keep().map_err(|e| create_err(e.error))?;
        let path = absolutize(path);

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "materialized image");
        self.outstanding.insert(path.clone());
        Ok(path)
    }

    /// Delete a materialized file. Releasing a path that is already gone is not an error.
    /// A path that could not be removed stays outstanding.
    pub fn release(&mut self, path: &Path) -> Result<(), StoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "released image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Remove {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
        self.outstanding.remove(path);
        Ok(())
    }

    /// Release every outstanding path, returning how many could not be removed.
    pub fn release_all(&mut self) -> usize {
        let paths: Vec<PathBuf> = self.outstanding.iter().cloned().collect();
        let mut failed = 0;
        for path in paths {
            if let Err(err) = self.release(&path) {
                tracing::warn!(error = %err, "temp image cleanup failed");
                failed += 1;
            }
        }
        failed
    }

    /// Paths handed out and not yet released.
    pub fn outstanding(&self) -> impl Iterator<Item = &Path> {
        self.outstanding.iter().map(PathBuf::as_path)
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

impl Drop for EphemeralStore {
    fn drop(&mut self) {
        if !self.outstanding.is_empty() {
            tracing::debug!(count = self.outstanding.len(), "cleaning up temp images");
            self.release_all();
        }
    }
}
