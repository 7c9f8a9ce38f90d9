//! Upload routes.
//!
//! File upload, listing, download, replace and delete.
//!
//! Routes:
//! - GET /upload/list - List file records
//! - POST /upload/save - Upload one or more files (multipart)
//! - GET /upload/:id - Download file bytes
//! - PUT /upload/:id - Replace an existing file (multipart)
//! - DELETE /upload/:id - Delete record and file

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::FileRecord;
use crate::services::NewUpload;
use crate::{AppState, Error, Result};

/// Build upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list_files))
        .route("/save", post(save_files))
        .route(
            "/:id",
            get(download_file).put(update_file).delete(delete_file),
        )
}

/// Save response: the created records plus a per-file message.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub files: Vec<FileRecord>,
    pub messages: Vec<String>,
}

/// List all file records.
///
/// GET /upload/list
#[axum::debug_handler]
async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>> {
    let files = state.files.list().await?;
    Ok(Json(files))
}

/// Upload and save one or more files.
///
/// POST /upload/save
///
/// Accepts multipart/form-data with one or more "file" parts. Files are
/// saved in order; the first invalid part aborts the request (parts
/// already saved stay saved).
#[axum::debug_handler]
async fn save_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SaveResponse>> {
    let mut files = Vec::new();
    let mut messages = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".into());
        let content_type = field.content_type().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?;

        let record = state
            .files
            .save(NewUpload {
                original_file_name: original_file_name.clone(),
                content_type,
                data: data.to_vec(),
            })
            .await?;

        messages.push(format!(
            "{} saved successfully: {}",
            files.len() + 1,
            original_file_name
        ));
        files.push(record);
    }

    if files.is_empty() {
        return Err(Error::InvalidInput("No file provided".into()));
    }

    Ok(Json(SaveResponse { files, messages }))
}

/// Download file bytes.
///
/// GET /upload/:id
///
/// Responds with the stored content type (octet-stream by default) and a
/// Content-Disposition carrying the original uploaded filename. 404 when
/// the id is unknown or the blob is missing.
#[axum::debug_handler]
async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let (record, data) = state.files.load(id).await?;

    let content_type = record
        .content_type
        .unwrap_or_else(|| "application/octet-stream".into());

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.original_file_name),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Replace an existing file.
///
/// PUT /upload/:id
///
/// Accepts multipart/form-data with a single "file" part; returns the
/// updated record.
#[axum::debug_handler]
async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<FileRecord>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".into());
        let content_type = field.content_type().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?;

        let record = state
            .files
            .update(
                id,
                NewUpload {
                    original_file_name,
                    content_type,
                    data: data.to_vec(),
                },
            )
            .await?;

        return Ok(Json(record));
    }

    Err(Error::InvalidInput("No file provided".into()))
}

/// Delete a file record and its physical file.
///
/// DELETE /upload/:id
#[axum::debug_handler]
async fn delete_file(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.files.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
