//! Photo folder scanner
//!
//! Non-recursive discovery of image files by extension, followed by a
//! metadata pass that yields photos sorted by `(capture time, lower-cased
//! file name)`.

use chrono::{DateTime, Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::types::{display_name, MetadataReader, Photo};

/// Image extensions considered (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "heic", "heif", "tif", "tiff", "png", "dng", "nef", "cr2", "arw", "rw2", "orf",
    "raf", "srw",
];

/// Folder scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory could not be listed
    #[error("I/O error: {0}")]
    IoError(String),
}

#[derive(Debug, Clone, Default)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// Image files directly inside `root`, in name order
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_image_file(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) if e.depth() == 0 => return Err(ScanError::IoError(e.to_string())),
                Err(e) => tracing::warn!("Error accessing entry: {}", e),
            }
        }

        tracing::debug!(folder = %root.display(), files = files.len(), "Folder scanned");
        Ok(files)
    }

    /// Scan and read metadata, returning photos in capture order
    ///
    /// A file whose metadata cannot be read is treated as having no GPS and
    /// is timestamped with its modification time.
    pub async fn photos_in_capture_order(
        &self,
        root: &Path,
        reader: &dyn MetadataReader,
    ) -> Result<Vec<Photo>, ScanError> {
        let paths = self.scan(root)?;

        let mut photos = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata = match reader.read_metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Cannot read metadata");
                    Default::default()
                }
            };

            let captured_at = match metadata.captured_at {
                Some(ts) => ts,
                None => modified_time(&path),
            };
            photos.push(Photo {
                path,
                captured_at,
                gps: metadata.gps,
            });
        }

        sort_by_capture(&mut photos);
        Ok(photos)
    }
}

/// Sort by capture time, ties broken by lower-cased file name
pub fn sort_by_capture(photos: &mut [Photo]) {
    photos.sort_by_cached_key(|p| (p.captured_at, display_name(&p.path).to_lowercase()));
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Filesystem mtime as local time (epoch when unavailable)
fn modified_time(path: &Path) -> NaiveDateTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).naive_local())
        .unwrap_or_default()
}
