//! Storage facade: one store/get/delete contract over interchangeable
//! providers.

use crate::{
    Content, DeleteReceipt, FileInfo, FileRecord, FilesystemProvider, OutputMode, Payload,
    PostgresProvider, ProviderKind, StorageConfig, StorageProvider,
};
use chrono::Utc;
use depot_error::{DepotResult, StorageError, StorageErrorKind};
use uuid::Uuid;

/// Options for a get operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Requested payload shape; streams by default
    pub output: OutputMode,
}

/// A retrieved object: metadata record plus payload.
#[derive(Debug)]
pub struct Object {
    /// The stored metadata record
    pub meta: FileRecord,
    /// The payload, shaped per the requested output mode
    pub payload: Content,
}

/// Single entry point dispatching to the configured provider.
///
/// Normalizes caller input to one stream shape, generates object ids, and
/// merges provider-computed results into the returned record. Holds no state
/// beyond the provider itself; concurrent calls are independent.
pub struct Storage {
    provider: Box<dyn StorageProvider>,
}

impl Storage {
    /// Wrap an existing provider.
    pub fn new(provider: Box<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Construct the provider selected by the configuration.
    pub fn from_config(config: &StorageConfig) -> DepotResult<Self> {
        let provider: Box<dyn StorageProvider> = match config.provider {
            ProviderKind::Filesystem => {
                Box::new(FilesystemProvider::new(&config.filesystem.base_dir)?)
            }
            ProviderKind::Postgres => Box::new(PostgresProvider::new(&config.postgres)?),
        };
        Ok(Self::new(provider))
    }

    /// Name of the backing provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Prepare the backend (directories, tables, indexes). Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> DepotResult<()> {
        self.provider.init().await
    }

    /// Store a payload and return the complete metadata record.
    ///
    /// Generates a fresh id, defaults `filename` to the id and `content_type`
    /// to `application/octet-stream`, and delegates to the provider. The
    /// provider-computed `size`, `content_hash` and `locator` are merged in
    /// last, so caller-supplied values can never override them.
    #[tracing::instrument(skip(self, payload, info))]
    pub async fn store(&self, payload: Payload, info: FileInfo) -> DepotResult<FileRecord> {
        let id = Uuid::new_v4();
        let mut record = FileRecord {
            id,
            filename: info.filename.unwrap_or_else(|| id.to_string()),
            content_type: info
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: 0,
            content_hash: String::new(),
            metadata: info.metadata.unwrap_or_default(),
            created_at: Utc::now(),
            locator: String::new(),
            storage: self.provider.name().to_string(),
        };

        let stored = self.provider.store(&record, payload.into_stream()).await?;
        record.size = stored.size;
        record.content_hash = stored.content_hash;
        record.locator = stored.locator;

        tracing::info!(
            id = %record.id,
            size = record.size,
            hash = %record.content_hash,
            storage = %record.storage,
            "Stored object"
        );
        Ok(record)
    }

    /// Retrieve an object's metadata and payload.
    ///
    /// With the default `stream` output mode the backing resources (for the
    /// postgres provider, a transaction and its pooled connection) stay
    /// claimed until the returned stream is drained, dropped, or errors;
    /// dropping the stream releases them.
    pub async fn get(&self, id: Uuid, options: GetOptions) -> DepotResult<Object> {
        ensure_id(id)?;
        let (meta, payload) = self.provider.get(id, options.output).await?;
        Ok(Object { meta, payload })
    }

    /// Delete an object's payload and metadata together.
    ///
    /// Deleting an unknown id fails with `NotFound`. Behavior when a delete
    /// races a streamed `get` on the same id is undefined; the engine does no
    /// per-id locking.
    pub async fn delete(&self, id: Uuid) -> DepotResult<DeleteReceipt> {
        ensure_id(id)?;
        self.provider.delete(id).await?;
        tracing::info!(id = %id, "Deleted object");
        Ok(DeleteReceipt { id, deleted: true })
    }
}

/// Ids are typed, so "missing" means the nil uuid.
fn ensure_id(id: Uuid) -> DepotResult<()> {
    if id.is_nil() {
        Err(StorageError::new(StorageErrorKind::MissingId).into())
    } else {
        Ok(())
    }
}
