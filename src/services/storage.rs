//! Physical file storage under the upload root.
//!
//! Everything that touches a path or the disk lives here: the traversal
//! guard that keeps stored relative paths inside the upload root, the
//! extension and filename resolvers, and the actual read/write/remove
//! operations that the unit of work defers until after commit.

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Filesystem storage rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `root`, normalized to an absolute path.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root
            .as_ref()
            .absolutize()
            .map_err(|e| Error::StorageIo(format!("invalid upload root: {}", e)))?
            .into_owned();

        Ok(Self { root })
    }

    /// The absolute upload root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored relative path against the upload root.
    ///
    /// Joins onto the root, normalizes `.`/`..` segments lexically, and
    /// fails with `PathTraversal` if the result lands outside the root.
    /// Stored paths are trusted only after passing this check, so a
    /// corrupted or malicious `file_path` can never escape the sandbox.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = self
            .root
            .join(relative)
            .absolutize()
            .map_err(|_| Error::PathTraversal(relative.to_string()))?
            .into_owned();

        if !path.starts_with(&self.root) {
            return Err(Error::PathTraversal(relative.to_string()));
        }

        Ok(path)
    }

    /// Write bytes to a resolved path, creating the directory if needed.
    ///
    /// Overwrites any pre-existing file at the path; replace reuses the
    /// same id-derived name on purpose.
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::StorageIo(format!("failed to create upload dir: {}", e)))?;
        }

        tokio::fs::write(path, data)
            .await
            .map_err(|e| Error::StorageIo(format!("failed to write {}: {}", path.display(), e)))?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Read the bytes at a resolved path.
    ///
    /// A missing or unreadable file under an existing metadata row is the
    /// divergence case, surfaced as `FileUnavailable`.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|_| Error::FileUnavailable(path.display().to_string()))
    }

    /// Remove the file at a resolved path.
    ///
    /// Runs post-commit, after the metadata row is already gone. Any
    /// failure (missing file included) leaves a dangling blob rather than
    /// a dangling record and is reported as `PostCommitCleanupFailed`.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(
                "Failed to delete {} after its metadata row was removed: {}",
                path.display(),
                e
            );
            return Err(Error::PostCommitCleanupFailed(format!(
                "{}: {}",
                path.display(),
                e
            )));
        }

        debug!("Deleted {}", path.display());
        Ok(())
    }
}

/// Determine a safe, lower-cased extension for an upload.
///
/// Filename extension first, then a fixed content-type table, then the
/// generic `bin` fallback. Total: always yields some extension.
pub fn resolve_extension(original_filename: &str, content_type: Option<&str>) -> String {
    Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .or_else(|| {
            content_type
                .and_then(extension_for_content_type)
                .map(String::from)
        })
        .unwrap_or_else(|| "bin".to_string())
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Strip any directory components from a client-supplied filename.
///
/// Handles both separator styles; an empty or all-separator name becomes
/// `unnamed`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}
