//! Uploaded image storage.
//!
//! Files live under the media root and are referenced in the database by
//! their media-relative path (e.g. `products/main/3f2a….png`). They are
//! served at `/media/<path>`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Extensions accepted for images, lower-case.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Directories the media root starts out with.
pub const MEDIA_DIRECTORIES: &[&str] = &["products/main", "products/gallery", "shops", "users"];

/// URL prefix under which media is served.
pub const MEDIA_URL: &str = "/media";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported image type: {0:?}")]
    UnsupportedType(String),

    #[error("file too large ({size} bytes, limit {max})")]
    TooLarge { size: usize, max: usize },

    #[error("empty file")]
    Empty,
}

/// What an upload is for; decides its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    ProductMain,
    ProductGallery,
}

impl ImageKind {
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::ProductMain => "products/main",
            Self::ProductGallery => "products/gallery",
        }
    }
}

/// Lower-cased extension of an uploaded filename, if any.
fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}

/// Fresh media-relative path for an upload: `<dir>/<uuid-hex>[.<ext>]`.
#[must_use]
pub fn upload_path(kind: ImageKind, filename: &str) -> String {
    let stem = Uuid::new_v4().simple();
    match extension_of(filename) {
        Some(ext) => format!("{}/{stem}.{ext}", kind.directory()),
        None => format!("{}/{stem}", kind.directory()),
    }
}

/// Public URL of a stored file.
#[must_use]
pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL}/{path}")
}

/// Writes and removes files under the media root.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check an upload before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` for empty, oversized, or non-image files.
    pub fn validate(&self, filename: &str, size: usize) -> Result<(), MediaError> {
        if size == 0 {
            return Err(MediaError::Empty);
        }
        if size > self.max_bytes {
            return Err(MediaError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        match extension_of(filename) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(MediaError::UnsupportedType(filename.to_owned())),
        }
    }

    /// Store an upload and return its media-relative path.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if validation or the write fails.
    pub async fn save(
        &self,
        kind: ImageKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        self.validate(filename, bytes.len())?;
        let relative = upload_path(kind, filename);
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Remove a stored file. Missing files and paths escaping the root are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the file exists but cannot be removed.
    pub async fn delete(&self, relative: &str) -> Result<(), MediaError> {
        let path = Path::new(relative);
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            tracing::warn!(path = %relative, "Refusing to delete media outside the root");
            return Ok(());
        }
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Empty the media root and recreate the standard directories, each
    /// holding a `.gitkeep`.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the tree cannot be rebuilt.
    pub async fn reset(&self) -> Result<(), MediaError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        for dir in MEDIA_DIRECTORIES {
            let path = self.root.join(dir);
            tokio::fs::create_dir_all(&path).await?;
            tokio::fs::write(path.join(".gitkeep"), b"").await?;
        }
        Ok(())
    }
}
