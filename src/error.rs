//! Error types for Filedepot.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Validation errors, detected before any state change
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: max {max_size} bytes")]
    TooLarge { max_size: usize },

    #[error("Extension not allowed: {0}")]
    DisallowedExtension(String),

    #[error("Path escapes the upload root: {0}")]
    PathTraversal(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Resource errors
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The metadata row exists but the physical file does not.
    #[error("File unavailable: {0}")]
    FileUnavailable(String),

    // Server-side faults
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage I/O error: {0}")]
    StorageIo(String),

    /// Physical file delete failed after the metadata row was already
    /// removed. The row deletion is not reversed; the leftover file is a
    /// detectable divergence for an operator to reconcile.
    #[error("Post-commit cleanup failed: {0}")]
    PostCommitCleanupFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400
            Self::EmptyFile
            | Self::DisallowedExtension(_)
            | Self::PathTraversal(_)
            | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,

            // 404
            Self::RecordNotFound(_) | Self::FileUnavailable(_) => StatusCode::NOT_FOUND,

            // 413
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 500
            Self::Database(_)
            | Self::StorageIo(_)
            | Self::PostCommitCleanupFailed(_)
            | Self::Internal(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyFile => "EMPTY_FILE",
            Self::TooLarge { .. } => "FILE_TOO_LARGE",
            Self::DisallowedExtension(_) => "DISALLOWED_EXTENSION",
            Self::PathTraversal(_) => "PATH_TRAVERSAL",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::RecordNotFound(_) => "RECORD_NOT_FOUND",
            Self::FileUnavailable(_) => "FILE_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::StorageIo(_) => "STORAGE_IO_ERROR",
            Self::PostCommitCleanupFailed(_) => "POST_COMMIT_CLEANUP_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON parsing error: {}", err))
    }
}
