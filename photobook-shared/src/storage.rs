//! Local file storage for uploaded pictures
//!
//! Uploaded files are validated as images, renamed to a random UUID and
//! written below the media root in one directory per [`MediaKind`]. The
//! database only ever stores the returned relative path.
//!
//! ```text
//! <media root>/
//!   album/banner/<uuid>.<ext>
//!   album/images/<uuid>.<ext>
//!   avatars/<uuid>.<ext>
//! ```

use image::ImageFormat;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Accepted upload formats, detected from the file contents
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Default upload limit (10 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("The uploaded file is empty")]
    Empty,

    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Upload a valid image. Allowed: JPEG, PNG, GIF, WebP")]
    UnsupportedFormat,

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True for errors caused by the uploaded content rather than the server
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StorageError::Empty | StorageError::TooLarge { .. } | StorageError::UnsupportedFormat
        )
    }
}

/// Where an uploaded picture is used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Banner,
    AlbumImage,
    Avatar,
}

impl MediaKind {
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::Banner => "album/banner",
            MediaKind::AlbumImage => "album/images",
            MediaKind::Avatar => "avatars",
        }
    }
}

/// Metadata about a stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the media root, with `/` separators
    pub path: String,
    pub content_type: &'static str,
    pub size: u64,
}

/// Checks size and format of an upload, returning its MIME type
pub fn validate_image(data: &[u8], max_bytes: usize) -> Result<&'static str, StorageError> {
    if data.is_empty() {
        return Err(StorageError::Empty);
    }
    if data.len() > max_bytes {
        return Err(StorageError::TooLarge {
            size: data.len(),
            max: max_bytes,
        });
    }

    let format = image::guess_format(data).map_err(|_| StorageError::UnsupportedFormat)?;
    if !ALLOWED_FORMATS.contains(&format) {
        return Err(StorageError::UnsupportedFormat);
    }

    Ok(format.to_mime_type())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Filesystem storage rooted at the media directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Creates the media root and the per-kind directories
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for kind in [MediaKind::Banner, MediaKind::AlbumImage, MediaKind::Avatar] {
            tokio::fs::create_dir_all(self.root.join(kind.dir())).await?;
        }
        Ok(())
    }

    /// Validates and writes an uploaded picture under a fresh name
    pub async fn store_image(&self, kind: MediaKind, data: &[u8]) -> Result<StoredFile, StorageError> {
        let content_type = validate_image(data, self.max_bytes)?;

        let relative = format!(
            "{}/{}.{}",
            kind.dir(),
            Uuid::new_v4(),
            extension_for(content_type)
        );
        let full_path = self.resolve(&relative)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, data).await?;

        debug!(path = %relative, size = data.len(), "Stored upload");

        Ok(StoredFile {
            path: relative,
            content_type,
            size: data.len() as u64,
        })
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(self.resolve(relative)?).await?)
    }

    pub async fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Removes a stored file; a file that is already gone is not an error
    pub async fn delete(&self, relative: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.resolve(relative)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes several files, logging failures instead of stopping
    ///
    /// Returns the number of paths that could not be removed.
    pub async fn delete_all(&self, paths: &[String]) -> usize {
        let mut failed = 0;
        for path in paths {
            if let Err(e) = self.delete(path).await {
                warn!(path = %path, error = %e, "Failed to remove stored file");
                failed += 1;
            }
        }
        failed
    }

    /// Maps a stored relative path onto the media root
    ///
    /// Rejects absolute paths and any `..` component.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        let is_plain = !relative.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }

        Ok(self.root.join(path))
    }
}
