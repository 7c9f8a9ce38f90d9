//! Application state for Filedepot.
//!
//! Contains the shared state that is passed to all handlers.

use crate::db::DbPool;
use crate::services::{FileService, FileStorage};
use crate::{config, Result};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// File upload/download orchestration.
    pub files: FileService,
}

impl AppState {
    /// Create a new application state, initializing all services.
    pub async fn new() -> Result<Self> {
        let config = config::config();

        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        let storage = FileStorage::new(&config.storage.upload_dir)?;
        let files = FileService::new(db.clone(), storage);

        Ok(Self { db, files })
    }
}
