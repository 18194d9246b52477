//! Top-level error wrapper types.

use crate::{ConfigError, StorageError};
#[cfg(feature = "database")]
use crate::DatabaseError;

/// This is the foundation error enum for the Depot workspace.
///
/// # Examples
///
/// ```
/// use depot_error::{ConfigError, DepotError};
///
/// let cfg_err = ConfigError::new("Missing provider");
/// let err: DepotError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DepotErrorKind {
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Database error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Depot error with kind discrimination.
///
/// # Examples
///
/// ```
/// use depot_error::{ConfigError, DepotResult};
///
/// fn might_fail() -> DepotResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Depot Error: {}", _0)]
pub struct DepotError(Box<DepotErrorKind>);

impl DepotError {
    /// Create a new error from a kind.
    pub fn new(kind: DepotErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DepotErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to DepotErrorKind
impl<T> From<T> for DepotError
where
    T: Into<DepotErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Depot operations.
///
/// # Examples
///
/// ```
/// use depot_error::{DepotResult, StorageError, StorageErrorKind};
///
/// fn lookup() -> DepotResult<String> {
///     Err(StorageError::new(StorageErrorKind::MissingId))?
/// }
/// ```
pub type DepotResult<T> = std::result::Result<T, DepotError>;
