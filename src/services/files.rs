//! File service orchestration.
//!
//! Composes validation, the metadata store and the commit-ordered unit
//! of work. Disk state only ever reflects committed metadata: every
//! write or delete of physical bytes is scheduled through
//! [`UnitOfWork::after_commit`] and runs exactly once, after the owning
//! transaction commits.

use uuid::Uuid;

use crate::db::{self, DbPool, FileRecord};
use crate::services::storage::{resolve_extension, sanitize_file_name, FileStorage};
use crate::services::unit_of_work::UnitOfWork;
use crate::{Error, Result};

/// Hard ceiling on a single uploaded file.
pub const MAX_FILE_SIZE: usize = 3 * 1024 * 1024;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// An upload as received from the client, before validation.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub original_file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Orchestrates file metadata and physical storage.
#[derive(Clone)]
pub struct FileService {
    db: DbPool,
    storage: FileStorage,
}

impl FileService {
    pub fn new(db: DbPool, storage: FileStorage) -> Self {
        Self { db, storage }
    }

    /// Save a new upload.
    ///
    /// Two-phase: the record is inserted without a path to obtain the
    /// store-generated id, then updated with the id-derived path, all in
    /// one transaction. The byte write is deferred to after commit, so a
    /// rollback never leaves an orphan file.
    pub async fn save(&self, upload: NewUpload) -> Result<FileRecord> {
        let (name, ext) = self.validate(&upload)?;

        let mut uow = UnitOfWork::begin(&self.db).await?;

        let record = db::insert_file(
            uow.conn(),
            db::CreateFile {
                original_file_name: name,
                content_type: upload.content_type,
            },
        )
        .await?;

        let file_name = format!("{}.{}", record.id, ext);
        let target = self.storage.resolve(&file_name)?;
        let record = db::set_file_path(uow.conn(), &record.id, &file_name).await?;

        let storage = self.storage.clone();
        let data = upload.data;
        uow.after_commit(async move { storage.write(&target, &data).await });
        uow.commit().await?;

        Ok(record)
    }

    /// List all file records.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        db::list_files(&self.db).await
    }

    /// Get a file record by id.
    pub async fn get(&self, id: Uuid) -> Result<FileRecord> {
        db::get_file(&self.db, &id.to_string()).await
    }

    /// Replace an existing file's metadata and bytes.
    ///
    /// The path keeps the record's id but may change extension. A
    /// previous blob left at the old path in that case is not removed;
    /// reconciling it is an operator concern.
    pub async fn update(&self, id: Uuid, upload: NewUpload) -> Result<FileRecord> {
        let (name, ext) = self.validate(&upload)?;

        let mut uow = UnitOfWork::begin(&self.db).await?;

        let existing = db::get_file(uow.conn(), &id.to_string()).await?;

        let file_name = format!("{}.{}", existing.id, ext);
        let target = self.storage.resolve(&file_name)?;
        let record = db::update_file(
            uow.conn(),
            &existing.id,
            &name,
            upload.content_type.as_deref(),
            &file_name,
        )
        .await?;

        let storage = self.storage.clone();
        let data = upload.data;
        uow.after_commit(async move { storage.write(&target, &data).await });
        uow.commit().await?;

        Ok(record)
    }

    /// Delete a record and its physical file.
    ///
    /// The physical path is resolved before the row goes away; the disk
    /// delete runs only once the row deletion has committed. A failed
    /// disk delete leaves a dangling (inert) file, never a dangling
    /// record.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut uow = UnitOfWork::begin(&self.db).await?;

        let record = db::get_file(uow.conn(), &id.to_string()).await?;
        let target = record
            .file_path
            .as_deref()
            .map(|p| self.storage.resolve(p))
            .transpose()?;

        db::delete_file(uow.conn(), &record.id).await?;

        if let Some(path) = target {
            let storage = self.storage.clone();
            uow.after_commit(async move { storage.remove(&path).await });
        }

        uow.commit().await
    }

    /// Load a record and its bytes for download.
    ///
    /// The row read is consistent on its own; the disk read needs no
    /// transaction. A row whose blob is missing is the divergence case,
    /// surfaced as `FileUnavailable`.
    pub async fn load(&self, id: Uuid) -> Result<(FileRecord, Vec<u8>)> {
        let record = db::get_file(&self.db, &id.to_string()).await?;

        let relative = record
            .file_path
            .as_deref()
            .ok_or_else(|| Error::FileUnavailable(record.id.clone()))?;
        let path = self.storage.resolve(relative)?;
        let data = self.storage.read(&path).await?;

        Ok((record, data))
    }

    /// Fail-fast checks, all before the metadata row is touched.
    ///
    /// Returns the sanitized filename and resolved extension.
    fn validate(&self, upload: &NewUpload) -> Result<(String, String)> {
        if upload.data.is_empty() {
            return Err(Error::EmptyFile);
        }

        if upload.data.len() > MAX_FILE_SIZE {
            return Err(Error::TooLarge {
                max_size: MAX_FILE_SIZE,
            });
        }

        let name = sanitize_file_name(&upload.original_file_name);
        let ext = resolve_extension(&name, upload.content_type.as_deref());

        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(Error::DisallowedExtension(ext));
        }

        Ok((name, ext))
    }
}
