//! Integration tests for the file service.
//!
//! Exercises the commit-ordered protocol end to end against a real
//! SQLite database and a temporary upload root.

use std::path::PathBuf;

use filedepot::db::{self, DbPool};
use filedepot::services::{FileService, FileStorage, NewUpload, UnitOfWork, MAX_FILE_SIZE};
use filedepot::Error;
use tempfile::TempDir;
use uuid::Uuid;

struct TestEnv {
    // Keeps the tempdir (db + upload root) alive for the test duration.
    _dir: TempDir,
    pool: DbPool,
    service: FileService,
    root: PathBuf,
}

async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create tempdir");

    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().unwrap())
        .await
        .expect("Failed to create test database");
    db::initialize_schema(&pool)
        .await
        .expect("Failed to apply schema");

    let storage = FileStorage::new(dir.path().join("uploads")).expect("Failed to create storage");
    let root = storage.root().to_path_buf();
    let service = FileService::new(pool.clone(), storage);

    TestEnv {
        _dir: dir,
        pool,
        service,
        root,
    }
}

fn png_upload(name: &str, data: &[u8]) -> NewUpload {
    NewUpload {
        original_file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        data: data.to_vec(),
    }
}

fn record_id(record: &filedepot::db::FileRecord) -> Uuid {
    Uuid::parse_str(&record.id).expect("record id is a uuid")
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_save_creates_one_row_and_one_file() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"png bytes"))
        .await
        .unwrap();

    let expected_name = format!("{}.png", record.id);
    assert_eq!(record.file_path.as_deref(), Some(expected_name.as_str()));
    assert_eq!(record.original_file_name, "photo.png");

    // Exactly one row and one physical file, bytes intact.
    let rows = db::list_files(&env.pool).await.unwrap();
    assert_eq!(rows.len(), 1);

    let on_disk = tokio::fs::read(env.root.join(&expected_name)).await.unwrap();
    assert_eq!(on_disk, b"png bytes");
}

#[tokio::test]
async fn test_uppercase_extension_is_normalized() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.PNG", b"data"))
        .await
        .unwrap();

    assert!(record.file_path.unwrap().ends_with(".png"));
}

#[tokio::test]
async fn test_rollback_writes_no_file() {
    let env = setup().await;
    let storage = FileStorage::new(&env.root).unwrap();

    let mut uow = UnitOfWork::begin(&env.pool).await.unwrap();
    let record = db::insert_file(
        uow.conn(),
        db::CreateFile {
            original_file_name: "photo.png".into(),
            content_type: Some("image/png".into()),
        },
    )
    .await
    .unwrap();

    let file_name = format!("{}.png", record.id);
    let target = storage.resolve(&file_name).unwrap();
    db::set_file_path(uow.conn(), &record.id, &file_name)
        .await
        .unwrap();
    uow.after_commit(async move { storage.write(&target, b"data").await });

    uow.rollback().await.unwrap();

    // No row, no orphan file.
    assert!(db::list_files(&env.pool).await.unwrap().is_empty());
    assert!(!env.root.join(&file_name).exists());
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let env = setup().await;

    let err = env.service.save(png_upload("photo.png", b"")).await.unwrap_err();
    assert!(matches!(err, Error::EmptyFile));
    assert!(db::list_files(&env.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let env = setup().await;

    let data = vec![0u8; MAX_FILE_SIZE + 1];
    let err = env.service.save(png_upload("big.png", &data)).await.unwrap_err();
    assert!(matches!(err, Error::TooLarge { .. }));
    assert!(db::list_files(&env.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disallowed_extension_is_rejected() {
    let env = setup().await;

    let upload = NewUpload {
        original_file_name: "setup.exe".into(),
        content_type: Some("application/octet-stream".into()),
        data: b"mz".to_vec(),
    };
    let err = env.service.save(upload).await.unwrap_err();
    assert!(matches!(err, Error::DisallowedExtension(ref ext) if ext == "exe"));
    assert!(db::list_files(&env.pool).await.unwrap().is_empty());
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("holiday photo.png", b"original bytes"))
        .await
        .unwrap();

    let (loaded, data) = env.service.load(record_id(&record)).await.unwrap();
    assert_eq!(data, b"original bytes");
    // The client-facing name survives; the storage name does not leak.
    assert_eq!(loaded.original_file_name, "holiday photo.png");
}

#[tokio::test]
async fn test_get_returns_metadata_without_touching_disk() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"data"))
        .await
        .unwrap();

    // Metadata lookup works even with the blob gone.
    tokio::fs::remove_file(env.root.join(record.file_path.as_deref().unwrap()))
        .await
        .unwrap();

    let fetched = env.service.get(record_id(&record)).await.unwrap();
    assert_eq!(fetched.id, record.id);
    assert_eq!(fetched.original_file_name, "photo.png");

    let err = env.service.get(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_load_unknown_id_is_not_found() {
    let env = setup().await;

    let err = env.service.load(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_row_without_blob_is_file_unavailable() {
    let env = setup().await;

    // Metadata committed but the blob never written: the divergence case.
    let record = db::insert_file(
        &env.pool,
        db::CreateFile {
            original_file_name: "ghost.png".into(),
            content_type: Some("image/png".into()),
        },
    )
    .await
    .unwrap();
    let file_name = format!("{}.png", record.id);
    db::set_file_path(&env.pool, &record.id, &file_name)
        .await
        .unwrap();

    let err = env.service.load(record_id(&record)).await.unwrap_err();
    assert!(matches!(err, Error::FileUnavailable(_)));
}

#[tokio::test]
async fn test_traversal_in_stored_path_never_reads_outside_root() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"data"))
        .await
        .unwrap();

    // Corrupt the stored path directly, as a hostile writer would.
    sqlx::query("UPDATE files SET file_path = ? WHERE id = ?")
        .bind("../../etc/passwd")
        .bind(&record.id)
        .execute(&env.pool)
        .await
        .unwrap();

    let err = env.service.load(record_id(&record)).await.unwrap_err();
    assert!(matches!(err, Error::PathTraversal(_)));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_replaces_bytes_and_metadata() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"v1"))
        .await
        .unwrap();
    let id = record_id(&record);

    let replacement = NewUpload {
        original_file_name: "new.jpg".into(),
        content_type: Some("image/jpeg".into()),
        data: b"v2".to_vec(),
    };
    let updated = env.service.update(id, replacement).await.unwrap();

    assert_eq!(updated.id, record.id);
    assert_eq!(updated.original_file_name, "new.jpg");
    assert_eq!(updated.file_path.as_deref(), Some(format!("{}.jpg", record.id).as_str()));

    let (_, data) = env.service.load(id).await.unwrap();
    assert_eq!(data, b"v2");

    // Known gap, preserved: the superseded blob at the old extension stays.
    assert!(env.root.join(format!("{}.png", record.id)).exists());
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let env = setup().await;

    let err = env
        .service
        .update(Uuid::new_v4(), png_upload("photo.png", b"data"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_update_validates_before_touching_state() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"v1"))
        .await
        .unwrap();
    let id = record_id(&record);

    let err = env.service.update(id, png_upload("photo.png", b"")).await.unwrap_err();
    assert!(matches!(err, Error::EmptyFile));

    // Record and bytes untouched.
    let (_, data) = env.service.load(id).await.unwrap();
    assert_eq!(data, b"v1");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_row_and_file() {
    let env = setup().await;

    let record = env
        .service
        .save(png_upload("photo.png", b"data"))
        .await
        .unwrap();
    let id = record_id(&record);
    let path = env.root.join(record.file_path.as_deref().unwrap());
    assert!(path.exists());

    env.service.delete(id).await.unwrap();

    assert!(!path.exists());
    let err = env.service.load(id).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_delete_unknown_id_is_not_found() {
    let env = setup().await;

    let err = env.service.delete(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

#[tokio::test]
async fn test_delete_with_missing_blob_reports_cleanup_failure() {
    let env = setup().await;

    // Row with a path but no blob on disk.
    let record = db::insert_file(
        &env.pool,
        db::CreateFile {
            original_file_name: "ghost.png".into(),
            content_type: Some("image/png".into()),
        },
    )
    .await
    .unwrap();
    let file_name = format!("{}.png", record.id);
    db::set_file_path(&env.pool, &record.id, &file_name)
        .await
        .unwrap();

    let err = env.service.delete(record_id(&record)).await.unwrap_err();
    assert!(matches!(err, Error::PostCommitCleanupFailed(_)));

    // The committed row deletion stands: dangling file beats dangling record.
    let lookup = db::get_file(&env.pool, &record.id).await.unwrap_err();
    assert!(matches!(lookup, Error::RecordNotFound(_)));
}
