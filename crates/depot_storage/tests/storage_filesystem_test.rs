//! Tests for the filesystem storage provider.

mod common;

use depot_storage::{
    FileInfo, FilesystemProvider, GetOptions, OutputMode, Payload, Storage, StorageErrorKind,
};
use tempfile::TempDir;

fn filesystem_storage(dir: &TempDir) -> Storage {
    Storage::new(Box::new(FilesystemProvider::new(dir.path()).unwrap()))
}

#[tokio::test]
async fn contract_round_trip() {
    let dir = TempDir::new().unwrap();
    common::round_trip(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn contract_empty_payload() {
    let dir = TempDir::new().unwrap();
    common::empty_payload(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn contract_streamed_store() {
    let dir = TempDir::new().unwrap();
    common::streamed_store(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn contract_streamed_get() {
    let dir = TempDir::new().unwrap();
    common::streamed_get(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn contract_missing_object() {
    let dir = TempDir::new().unwrap();
    common::missing_object(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn contract_delete() {
    let dir = TempDir::new().unwrap();
    common::delete_removes(&filesystem_storage(&dir)).await;
}

#[tokio::test]
async fn path_output_mode_returns_on_disk_path() {
    let dir = TempDir::new().unwrap();
    let storage = filesystem_storage(&dir);

    let record = storage
        .store(Payload::from(common::HELLO), FileInfo::default())
        .await
        .unwrap();

    let object = storage
        .get(
            record.id,
            GetOptions {
                output: OutputMode::Path,
            },
        )
        .await
        .unwrap();

    match object.payload {
        depot_storage::Content::Path(ref path) => {
            assert!(path.starts_with(dir.path()));
            assert_eq!(std::fs::read(path).unwrap(), common::HELLO);
        }
        other => panic!("expected path content, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_sidecar_hides_payload() {
    let dir = TempDir::new().unwrap();
    let storage = filesystem_storage(&dir);

    let record = storage
        .store(Payload::from(common::HELLO), FileInfo::default())
        .await
        .unwrap();

    // Simulate a store that died between payload and sidecar: without the
    // sidecar the object must not be observable.
    std::fs::remove_file(dir.path().join(format!("{}.json", record.id))).unwrap();

    let err = storage
        .get(record.id, GetOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        common::storage_kind(&err),
        Some(StorageErrorKind::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_store_leaves_no_files() {
    let dir = TempDir::new().unwrap();
    let storage = filesystem_storage(&dir);

    let chunks: Vec<depot_storage::DepotResult<Vec<u8>>> = vec![
        Ok(b"partial".to_vec()),
        Err(depot_storage::StorageError::new(StorageErrorKind::FileRead(
            "source went away".to_string(),
        ))
        .into()),
    ];
    let payload = Payload::Stream(Box::pin(futures::stream::iter(chunks)));

    let err = storage.store(payload, FileInfo::default()).await;
    assert!(err.is_err());

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "expected empty dir, got {leftovers:?}");
}

#[tokio::test]
async fn delete_clears_disk_state() {
    let dir = TempDir::new().unwrap();
    let storage = filesystem_storage(&dir);

    let record = storage
        .store(Payload::from(common::HELLO), FileInfo::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

    storage.delete(record.id).await.unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
