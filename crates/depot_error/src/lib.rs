//! Error types for the Depot storage engine.
//!
//! This crate provides the foundation error types used throughout the Depot
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use depot_error::{DepotResult, StorageError, StorageErrorKind};
//!
//! fn fetch_object() -> DepotResult<Vec<u8>> {
//!     Err(StorageError::new(StorageErrorKind::NotFound("abc".to_string())))?
//! }
//!
//! match fetch_object() {
//!     Ok(data) => println!("Got {} bytes", data.len()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod storage;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{DepotError, DepotErrorKind, DepotResult};
pub use storage::{StorageError, StorageErrorKind};
