//! Configuration structures for provider selection and backend settings.
//!
//! Configuration loads from a TOML file with `DEPOT_*` environment variable
//! overrides (e.g. `DEPOT_PROVIDER=postgres`,
//! `DEPOT_POSTGRES__URL=postgres://...`). The postgres URL additionally falls
//! back to the conventional `DATABASE_URL` variable.

use config::{Config, Environment, File, FileFormat};
use depot_error::{ConfigError, DepotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend the facade dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Plain filesystem with sidecar metadata
    #[default]
    Filesystem,
    /// PostgreSQL native large objects
    Postgres,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Filesystem => write!(f, "filesystem"),
            ProviderKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// Filesystem backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilesystemConfig {
    /// Root directory for payload and sidecar files
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("depot-data")
}

/// PostgreSQL backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostgresConfig {
    /// Connection URL; falls back to `DATABASE_URL` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Schema holding the metadata table
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Metadata table name
    #[serde(default = "default_table")]
    pub table: String,
    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            schema: default_schema(),
            table: default_table(),
            max_connections: default_max_connections(),
        }
    }
}

impl PostgresConfig {
    /// Resolve the connection URL from the config or `DATABASE_URL`.
    pub fn url(&self) -> DepotResult<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| {
                ConfigError::new("postgres url not configured and DATABASE_URL not set").into()
            })
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "files".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Top-level storage engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Selected backend
    #[serde(default)]
    pub provider: ProviderKind,
    /// Filesystem backend settings
    #[serde(default)]
    pub filesystem: FilesystemConfig,
    /// PostgreSQL backend settings
    #[serde(default)]
    pub postgres: PostgresConfig,
}

impl StorageConfig {
    /// Load configuration from a TOML file, with `DEPOT_*` environment
    /// overrides taking precedence.
    pub fn from_file(path: impl AsRef<Path>) -> DepotResult<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
            .add_source(Environment::with_prefix("DEPOT").separator("__"))
            .build()
            .map_err(|e| ConfigError::new(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| ConfigError::new(e.to_string()).into())
    }

    /// Load configuration from `DEPOT_*` environment variables alone.
    pub fn from_env() -> DepotResult<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix("DEPOT").separator("__"))
            .build()
            .map_err(|e| ConfigError::new(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| ConfigError::new(e.to_string()).into())
    }
}
