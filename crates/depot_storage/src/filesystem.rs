//! Filesystem storage provider.
//!
//! Persists each payload as `{base_dir}/{id}` with a sidecar metadata record
//! at `{base_dir}/{id}.json`. Both are written to a temp file and renamed
//! into place; the sidecar lands last, so a half-written store is never
//! observable to a subsequent `get`.

use crate::{
    ByteStream, Content, DigestTee, FileRecord, OutputMode, StorageProvider, StoredPayload,
};
use depot_error::{DepotError, DepotResult, StorageError, StorageErrorKind};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// Read chunk size for streamed payloads, in bytes.
const CHUNK_SIZE: usize = 64 * 1024;

/// Filesystem storage backend.
///
/// Has no transaction or connection-lifetime concerns: writes complete before
/// `store` returns, and a streamed `get` holds only an open file handle.
pub struct FilesystemProvider {
    base_dir: PathBuf,
}

impl FilesystemProvider {
    /// Create a new filesystem provider rooted at `base_dir`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or accessed.
    #[tracing::instrument(skip(base_dir))]
    pub fn new(base_dir: impl Into<PathBuf>) -> DepotResult<Self> {
        let base_dir = base_dir.into();

        std::fs::create_dir_all(&base_dir).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_dir.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_dir.display(), "Created filesystem storage");
        Ok(Self { base_dir })
    }

    fn payload_path(&self, id: Uuid) -> PathBuf {
        self.base_dir.join(id.to_string())
    }

    fn sidecar_path(&self, id: Uuid) -> PathBuf {
        self.base_dir.join(format!("{id}.json"))
    }

    /// Stream the payload into `path` through the hashing tee, via a temp
    /// file renamed into place.
    async fn write_payload(
        &self,
        path: &Path,
        mut payload: ByteStream,
    ) -> DepotResult<(i64, String)> {
        let temp_path = self.base_dir.join(format!(
            "{}.payload.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        let mut tee = DigestTee::new();
        let written: DepotResult<()> = async {
            while let Some(chunk) = payload.next().await {
                let chunk = chunk?;
                tee.update(&chunk);
                file.write_all(&chunk).await.map_err(|e| {
                    StorageError::new(StorageErrorKind::FileWrite(format!(
                        "{}: {}",
                        temp_path.display(),
                        e
                    )))
                })?;
            }
            file.flush().await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "{}: {}",
                    temp_path.display(),
                    e
                )))
            })?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        Ok(tee.finalize())
    }

    /// Write the sidecar metadata record next to the payload.
    async fn write_sidecar(&self, id: Uuid, record: &FileRecord) -> DepotResult<()> {
        let sidecar = self.sidecar_path(id);
        let temp_path = self.base_dir.join(format!("{id}.json.tmp"));

        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!("sidecar for {id}: {e}")))
        })?;

        tokio::fs::write(&temp_path, json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &sidecar).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                sidecar.display(),
                e
            )))
        })?;

        Ok(())
    }

    async fn read_sidecar(&self, id: Uuid) -> DepotResult<FileRecord> {
        let sidecar = self.sidecar_path(id);
        let bytes = tokio::fs::read(&sidecar).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    sidecar.display(),
                    e
                )))
            }
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                sidecar.display(),
                e
            )))
            .into()
        })
    }
}

/// Chunked read stream over the payload file.
fn file_stream(path: PathBuf) -> ByteStream {
    Box::pin(async_stream::stream! {
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                yield Err(DepotError::from(StorageError::new(
                    StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)),
                )));
                return;
            }
        };
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok(buf[..n].to_vec()),
                Err(e) => {
                    yield Err(DepotError::from(StorageError::new(
                        StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)),
                    )));
                    break;
                }
            }
        }
    })
}

#[async_trait::async_trait]
impl StorageProvider for FilesystemProvider {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn init(&self) -> DepotResult<()> {
        tokio::fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                self.base_dir.display(),
                e
            )))
            .into()
        })
    }

    #[tracing::instrument(skip(self, record, payload), fields(id = %record.id))]
    async fn store(
        &self,
        record: &FileRecord,
        payload: ByteStream,
    ) -> DepotResult<StoredPayload> {
        let path = self.payload_path(record.id);
        let (size, content_hash) = self.write_payload(&path, payload).await?;
        let locator = path.to_string_lossy().to_string();

        let mut sidecar_record = record.clone();
        sidecar_record.size = size;
        sidecar_record.content_hash = content_hash.clone();
        sidecar_record.locator = locator.clone();

        // The sidecar makes the object visible; if it cannot be written the
        // payload file is removed so no partial object remains.
        if let Err(e) = self.write_sidecar(record.id, &sidecar_record).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        tracing::info!(
            id = %record.id,
            hash = %content_hash,
            size,
            path = %path.display(),
            "Stored object"
        );

        Ok(StoredPayload {
            size,
            content_hash,
            locator,
        })
    }

    #[tracing::instrument(skip(self), fields(id = %id, output = %output))]
    async fn get(&self, id: Uuid, output: OutputMode) -> DepotResult<(FileRecord, Content)> {
        let record = self.read_sidecar(id).await?;
        let path = self.payload_path(id);

        let content = match output {
            OutputMode::Path => Content::Path(path),
            OutputMode::Buffer => {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        StorageError::new(StorageErrorKind::NotFound(id.to_string()))
                    } else {
                        StorageError::new(StorageErrorKind::FileRead(format!(
                            "{}: {}",
                            path.display(),
                            e
                        )))
                    }
                })?;
                Content::Buffer(bytes)
            }
            OutputMode::Stream => Content::Stream(file_stream(path)),
        };

        tracing::debug!(id = %id, "Retrieved object");
        Ok((record, content))
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: Uuid) -> DepotResult<()> {
        let sidecar = self.sidecar_path(id);
        let path = self.payload_path(id);

        // Removing the sidecar first makes the object invisible atomically;
        // a payload unlink failure after that cannot expose a half-deleted
        // record to `get`.
        tokio::fs::remove_file(&sidecar).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "delete {}: {}",
                    sidecar.display(),
                    e
                )))
            }
        })?;

        tokio::fs::remove_file(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "delete {}: {}",
                path.display(),
                e
            )))
        })?;

        tracing::info!(id = %id, "Deleted object");
        Ok(())
    }
}
