//! Streaming content storage over interchangeable backends.
//!
//! This crate provides one `store`/`get`/`delete` contract over two
//! backends: a plain filesystem (payload file plus sidecar metadata) and
//! PostgreSQL native large objects (payload as an LO, metadata as a table
//! row, written in one transaction).
//!
//! # Features
//!
//! - **Single-pass hashing**: size and SHA-256 content hash are computed on
//!   the write path, never by buffering or re-reading the payload
//! - **Pluggable backends**: trait-based abstraction, selected from
//!   configuration by a small factory
//! - **Streamed reads**: a `get` can hand back a lazy byte sequence; the
//!   backing transaction and connection are released exactly once, whether
//!   the stream is drained, dropped, or errors
//!
//! # Example
//!
//! ```rust
//! use depot_storage::{FileInfo, GetOptions, OutputMode, Payload, Storage, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = StorageConfig::default();
//! config.filesystem.base_dir = "/tmp/depot".into();
//! let storage = Storage::from_config(&config)?;
//! storage.init().await?;
//!
//! // Store a payload
//! let record = storage
//!     .store(Payload::from("Hello World"), FileInfo::default())
//!     .await?;
//! assert_eq!(record.size, 11);
//!
//! // Retrieve it
//! let object = storage
//!     .get(record.id, GetOptions { output: OutputMode::Buffer })
//!     .await?;
//! assert_eq!(object.payload.into_bytes().await?, b"Hello World");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod digest;
mod facade;
mod filesystem;
mod payload;
mod postgres;
mod provider;
mod record;

pub use config::{FilesystemConfig, PostgresConfig, ProviderKind, StorageConfig};
pub use depot_error::{DepotError, DepotErrorKind, DepotResult, StorageError, StorageErrorKind};
pub use digest::DigestTee;
pub use facade::{GetOptions, Object, Storage};
pub use filesystem::FilesystemProvider;
pub use payload::{ByteStream, Payload};
pub use postgres::PostgresProvider;
pub use provider::{Content, OutputMode, StorageProvider};
pub use record::{DeleteReceipt, FileInfo, FileRecord, Metadata, StoredPayload};
