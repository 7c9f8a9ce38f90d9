//! API routes for Filedepot.

mod files;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

/// Request body cap for the whole router.
///
/// Above the per-file validation ceiling so an oversized upload reaches
/// validation and gets a proper FILE_TOO_LARGE error instead of a
/// transport-level rejection.
const MAX_REQUEST_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/upload", files::routes())
}

/// Assemble the application router with its body limit and state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
