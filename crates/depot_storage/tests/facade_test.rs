//! Tests for the storage facade: input validation, defaulting, and the
//! provider factory.

mod common;

use depot_storage::{
    FileInfo, FilesystemConfig, GetOptions, Payload, ProviderKind, Storage, StorageConfig,
    StorageErrorKind,
};
use tempfile::TempDir;
use uuid::Uuid;

fn filesystem_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        provider: ProviderKind::Filesystem,
        filesystem: FilesystemConfig {
            base_dir: dir.path().to_path_buf(),
        },
        postgres: Default::default(),
    }
}

#[tokio::test]
async fn factory_builds_configured_provider() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::from_config(&filesystem_config(&dir)).unwrap();
    assert_eq!(storage.provider_name(), "filesystem");
}

#[tokio::test]
async fn store_defaults_filename_and_content_type() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::from_config(&filesystem_config(&dir)).unwrap();

    let before = chrono::Utc::now();
    let record = storage
        .store(Payload::from("x"), FileInfo::default())
        .await
        .unwrap();

    assert_eq!(record.filename, record.id.to_string());
    assert_eq!(record.content_type, "application/octet-stream");
    assert_eq!(record.storage, "filesystem");
    assert!(record.metadata.is_empty());
    assert!(record.created_at >= before && record.created_at <= chrono::Utc::now());
}

#[tokio::test]
async fn store_generates_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::from_config(&filesystem_config(&dir)).unwrap();

    let first = storage
        .store(Payload::from("same"), FileInfo::default())
        .await
        .unwrap();
    let second = storage
        .store(Payload::from("same"), FileInfo::default())
        .await
        .unwrap();

    // Identical content still gets its own object; hashing is an integrity
    // fingerprint, not a deduplication key.
    assert_ne!(first.id, second.id);
    assert_eq!(first.content_hash, second.content_hash);
}

#[tokio::test]
async fn nil_id_is_rejected_before_backend_work() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::from_config(&filesystem_config(&dir)).unwrap();

    let err = storage
        .get(Uuid::nil(), GetOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        common::storage_kind(&err),
        Some(StorageErrorKind::MissingId)
    ));

    let err = storage.delete(Uuid::nil()).await.unwrap_err();
    assert!(matches!(
        common::storage_kind(&err),
        Some(StorageErrorKind::MissingId)
    ));
}

#[tokio::test]
async fn json_payload_coercion_stores_text_rendering() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::from_config(&filesystem_config(&dir)).unwrap();

    let payload = Payload::from_json(serde_json::json!(1234)).unwrap();
    let record = storage.store(payload, FileInfo::default()).await.unwrap();
    assert_eq!(record.size, 4);

    let object = storage
        .get(
            record.id,
            GetOptions {
                output: depot_storage::OutputMode::Buffer,
            },
        )
        .await
        .unwrap();
    assert_eq!(object.payload.into_bytes().await.unwrap(), b"1234");
}
