//! Provider trait definition.

use crate::{ByteStream, FileRecord, StoredPayload};
use depot_error::{DepotResult, StorageError, StorageErrorKind};
use futures::StreamExt;
use std::path::PathBuf;
use uuid::Uuid;

/// Requested payload shape for a get operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    /// Lazy byte sequence (the default)
    #[default]
    Stream,
    /// Fully buffered bytes
    Buffer,
    /// On-disk path; only backends with a filesystem presence support this
    Path,
}

impl OutputMode {
    /// String representation for error messages and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Stream => "stream",
            OutputMode::Buffer => "buffer",
            OutputMode::Path => "path",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retrieved payload, shaped per the requested [`OutputMode`].
pub enum Content {
    /// Lazy byte sequence
    Stream(ByteStream),
    /// Fully buffered bytes
    Buffer(Vec<u8>),
    /// On-disk payload path
    Path(PathBuf),
}

impl Content {
    /// Drain the payload into memory regardless of shape.
    ///
    /// For a stream this consumes the underlying resource (and releases the
    /// backing connection, if any); for a path the file is read from disk.
    pub async fn into_bytes(self) -> DepotResult<Vec<u8>> {
        match self {
            Content::Buffer(bytes) => Ok(bytes),
            Content::Stream(mut stream) => {
                let mut bytes = Vec::new();
                while let Some(chunk) = stream.next().await {
                    bytes.extend_from_slice(&chunk?);
                }
                Ok(bytes)
            }
            Content::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into()
            }),
        }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Stream(_) => f.debug_tuple("Stream").finish(),
            Content::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Content::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Trait for pluggable storage backends.
///
/// Implementations persist the binary payload together with its metadata
/// record, atomically per backend: a subsequent `get` must never observe a
/// payload without its metadata or vice versa.
#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync {
    /// Backend name recorded on stored objects (e.g. "filesystem", "postgres").
    fn name(&self) -> &'static str;

    /// Prepare the backend (create directories, tables, indexes).
    ///
    /// Idempotent; safe to call on every process start.
    async fn init(&self) -> DepotResult<()>;

    /// Persist the payload and the metadata record in one atomic unit.
    ///
    /// The payload is consumed in a single pass; the returned size and
    /// content hash reflect the bytes actually written, not any
    /// caller-supplied value.
    async fn store(&self, record: &FileRecord, payload: ByteStream)
    -> DepotResult<StoredPayload>;

    /// Retrieve the metadata record and payload for `id`.
    ///
    /// Fails with `NotFound` for an unknown id, and with
    /// `UnsupportedOutputMode` when the backend cannot produce the requested
    /// shape.
    async fn get(&self, id: Uuid, output: OutputMode) -> DepotResult<(FileRecord, Content)>;

    /// Remove the payload and the metadata record together, or neither.
    ///
    /// Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: Uuid) -> DepotResult<()>;
}
