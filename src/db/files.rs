//! File metadata queries.
//!
//! One row per uploaded file. Query functions are generic over the
//! executor so the same function runs against the pool for reads or
//! against a unit-of-work connection for transactional writes.
//!
//! The store generates record ids: `insert_file` mints a UUIDv4 at
//! insert time, which is why save is two-phase (insert without a path
//! to obtain the id, then update the row with the id-derived path).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::Sqlite;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{Error, Result};

/// File metadata record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub original_file_name: String,
    /// Relative to the upload root; always `"<id>.<ext>"` once assigned.
    pub file_path: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// Input for creating a new file record.
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub original_file_name: String,
    pub content_type: Option<String>,
}

/// Insert a new record with no path, generating its id.
///
/// The insert executes immediately so the id is available inside the
/// enclosing transaction before any path is computed.
pub async fn insert_file<'e, E>(executor: E, input: CreateFile) -> Result<FileRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();

    sqlx::query_as::<_, FileRecord>(
        r#"
        INSERT INTO files (id, original_file_name, type)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&input.original_file_name)
    .bind(&input.content_type)
    .fetch_one(executor)
    .await
    .map_err(Error::Database)
}

/// Set the id-derived relative path on a freshly inserted record.
pub async fn set_file_path<'e, E>(executor: E, id: &str, file_path: &str) -> Result<FileRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, FileRecord>(
        r#"
        UPDATE files SET file_path = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(file_path)
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::RecordNotFound(id.to_string()))
}

/// Replace the mutable fields of an existing record.
pub async fn update_file<'e, E>(
    executor: E,
    id: &str,
    original_file_name: &str,
    content_type: Option<&str>,
    file_path: &str,
) -> Result<FileRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, FileRecord>(
        r#"
        UPDATE files SET original_file_name = ?, type = ?, file_path = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(original_file_name)
    .bind(content_type)
    .bind(file_path)
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::RecordNotFound(id.to_string()))
}

/// Get a file record by id.
pub async fn get_file<'e, E>(executor: E, id: &str) -> Result<FileRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound(id.to_string()))
}

/// List all file records.
pub async fn list_files<'e, E>(executor: E) -> Result<Vec<FileRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, FileRecord>("SELECT * FROM files ORDER BY id")
        .fetch_all(executor)
        .await
        .map_err(Error::Database)
}

/// Delete a file record by id.
pub async fn delete_file<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::RecordNotFound(id.to_string()));
    }

    Ok(())
}
