//! Storage error types.

/// Kinds of storage errors.
///
/// Validation kinds (`UnsupportedPayloadType`, `EmptyPayload`, `MissingId`,
/// `UnsupportedOutputMode`) are raised before any backend interaction begins;
/// the remaining kinds surface failures from the backend itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Payload shape cannot be coerced to bytes
    #[display("Unsupported payload type: {}", _0)]
    UnsupportedPayloadType(String),
    /// No payload was provided at all (zero-length payloads are valid)
    #[display("No payload provided")]
    EmptyPayload,
    /// Object id is missing (nil)
    #[display("Missing object id")]
    MissingId,
    /// No object stored under the given id
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Requested output mode is not supported by the backend
    #[display("Unsupported output mode: {}", _0)]
    UnsupportedOutputMode(String),
    /// Failed to create storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write file
    #[display("Failed to write file: {}", _0)]
    FileWrite(String),
    /// Failed to read file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use depot_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("/path/to/file".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
