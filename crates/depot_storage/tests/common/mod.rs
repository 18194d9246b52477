//! Provider contract checks shared across backends.
//!
//! Each check takes a ready `Storage` facade so the same suite runs against
//! the filesystem provider and the postgres provider.

#![allow(dead_code)]

use depot_storage::{
    DepotError, DepotErrorKind, FileInfo, GetOptions, OutputMode, Payload, Storage,
    StorageErrorKind,
};
use uuid::Uuid;

pub const HELLO: &[u8] = b"Hello World";
pub const HELLO_SHA256: &str = "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e";
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

pub fn storage_kind(err: &DepotError) -> Option<&StorageErrorKind> {
    match err.kind() {
        DepotErrorKind::Storage(e) => Some(&e.kind),
        _ => None,
    }
}

pub fn hello_info() -> FileInfo {
    let mut metadata = depot_storage::Metadata::new();
    metadata.insert("author".to_string(), serde_json::json!("Alice"));
    FileInfo {
        filename: Some("hello.txt".to_string()),
        content_type: Some("text/plain".to_string()),
        metadata: Some(metadata),
    }
}

/// Store "Hello World", check the computed record, read it back as a buffer.
pub async fn round_trip(storage: &Storage) {
    let record = storage
        .store(Payload::from(HELLO), hello_info())
        .await
        .unwrap();

    assert_eq!(record.filename, "hello.txt");
    assert_eq!(record.content_type, "text/plain");
    assert_eq!(record.size, 11);
    assert_eq!(record.content_hash, HELLO_SHA256);
    assert_eq!(record.metadata["author"], serde_json::json!("Alice"));
    assert!(!record.locator.is_empty());

    let object = storage
        .get(
            record.id,
            GetOptions {
                output: OutputMode::Buffer,
            },
        )
        .await
        .unwrap();
    assert_eq!(object.meta.content_hash, HELLO_SHA256);
    assert_eq!(object.payload.into_bytes().await.unwrap(), HELLO);
}

/// A zero-length payload stores fine and hashes to the empty digest.
pub async fn empty_payload(storage: &Storage) {
    let record = storage
        .store(Payload::from(Vec::new()), FileInfo::default())
        .await
        .unwrap();

    assert_eq!(record.size, 0);
    assert_eq!(record.content_hash, EMPTY_SHA256);

    let object = storage
        .get(
            record.id,
            GetOptions {
                output: OutputMode::Buffer,
            },
        )
        .await
        .unwrap();
    assert!(object.payload.into_bytes().await.unwrap().is_empty());
}

/// A multi-chunk stream payload is hashed and sized across chunk boundaries.
pub async fn streamed_store(storage: &Storage) {
    let chunks: Vec<depot_storage::DepotResult<Vec<u8>>> =
        vec![Ok(b"Hello ".to_vec()), Ok(b"World".to_vec())];
    let payload = Payload::Stream(Box::pin(futures::stream::iter(chunks)));

    let record = storage.store(payload, FileInfo::default()).await.unwrap();
    assert_eq!(record.size, 11);
    assert_eq!(
        record.content_hash,
        "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e"
    );
}

/// The default output mode returns a lazy stream with the same bytes.
pub async fn streamed_get(storage: &Storage) {
    let record = storage
        .store(Payload::from(HELLO), FileInfo::default())
        .await
        .unwrap();

    let object = storage.get(record.id, GetOptions::default()).await.unwrap();
    assert!(matches!(object.payload, depot_storage::Content::Stream(_)));
    assert_eq!(object.payload.into_bytes().await.unwrap(), HELLO);
}

/// Unknown ids fail with NotFound on both get and delete.
pub async fn missing_object(storage: &Storage) {
    let id = Uuid::new_v4();

    let err = storage.get(id, GetOptions::default()).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        Some(StorageErrorKind::NotFound(_))
    ));

    let err = storage.delete(id).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        Some(StorageErrorKind::NotFound(_))
    ));
}

/// Delete removes both payload and metadata; a second delete is NotFound.
pub async fn delete_removes(storage: &Storage) {
    let record = storage
        .store(Payload::from(b"Delete me".as_slice()), FileInfo::default())
        .await
        .unwrap();

    let receipt = storage.delete(record.id).await.unwrap();
    assert_eq!(receipt.id, record.id);
    assert!(receipt.deleted);

    let err = storage
        .get(record.id, GetOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        Some(StorageErrorKind::NotFound(_))
    ));

    let err = storage.delete(record.id).await.unwrap_err();
    assert!(matches!(
        storage_kind(&err),
        Some(StorageErrorKind::NotFound(_))
    ));
}
