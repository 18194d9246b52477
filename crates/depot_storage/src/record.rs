//! File record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque caller-supplied key-value mapping, persisted verbatim.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored object's metadata record.
///
/// Returned by `store` with the provider-computed fields filled in, and by
/// `get` alongside the payload. Callers address objects by `id` only; the
/// `locator` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique identifier, generated at store time and immutable afterwards
    pub id: Uuid,
    /// Original filename, defaulted to the id when not supplied
    pub filename: String,
    /// MIME type, defaulted to `application/octet-stream`
    pub content_type: String,
    /// Exact byte count of the stored payload, computed during the store pass
    pub size: i64,
    /// Lowercase hex SHA-256 of the stored bytes, computed in the same pass
    pub content_hash: String,
    /// Caller-supplied metadata, opaque to the engine
    #[serde(default)]
    pub metadata: Metadata,
    /// Timestamp assigned once at store time
    pub created_at: DateTime<Utc>,
    /// Backend-specific payload reference (filesystem path or large-object oid)
    pub locator: String,
    /// Name of the provider that holds the payload
    pub storage: String,
}

/// Caller-supplied information accompanying a store operation.
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    /// Original filename
    pub filename: Option<String>,
    /// MIME type
    pub content_type: Option<String>,
    /// Arbitrary key-value metadata
    pub metadata: Option<Metadata>,
}

/// Provider-computed result of a store operation.
///
/// These fields always reflect the bytes actually persisted and override any
/// caller-supplied values when merged into the returned [`FileRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    /// Exact byte count written to the backend
    pub size: i64,
    /// Lowercase hex SHA-256 of the written bytes
    pub content_hash: String,
    /// Backend-specific payload reference
    pub locator: String,
}

/// Acknowledgement returned by a delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteReceipt {
    /// The deleted object's id
    pub id: Uuid,
    /// Always `true`; a failed delete returns an error instead
    pub deleted: bool,
}
