//! Storage Layer
//!
//! Append-only persistence for station feeds behind the [`ReadingStore`]
//! trait. Two backends are provided: [`SqliteStore`] for durable on-disk
//! storage and [`MemoryStore`] for tests and ephemeral runs.

mod clock;
mod feed;
mod memory;
mod sqlite;

pub use clock::{next_tstamp, now_millis};
pub use feed::{Feed, Reading};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

/// Append-only log of station feeds.
///
/// Implementations assign `id` and `tstamp` atomically inside `store`, so
/// the order of ids, the order of insertion and the order of timestamps all
/// agree. Loads return feeds in ascending id order.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a reading and return the fully populated feed.
    ///
    /// The write is durable by the time this returns.
    async fn store(&self, reading: Reading) -> Result<Feed, StorageError>;

    /// Feeds with `from < tstamp < to`, ascending by id.
    async fn load_range(&self, from: i64, to: i64) -> Result<Vec<Feed>, StorageError>;

    /// Feeds with `tstamp > from`, ascending by id.
    async fn load_since(&self, from: i64) -> Result<Vec<Feed>, StorageError>;

    /// Total number of stored feeds
    async fn count(&self) -> Result<u64, StorageError>;
}

/// Which backend to open at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selection
    #[serde(default = "default_backend")]
    pub backend: Backend,
    /// Database file path (sqlite only)
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_backend() -> Backend {
    Backend::Sqlite
}

fn default_path() -> String {
    "feeds.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
        }
    }
}

/// Open the store described by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ReadingStore>, StorageError> {
    match config.backend {
        Backend::Sqlite => {
            let store = SqliteStore::open(&config.path).await?;
            Ok(Arc::new(store))
        }
        Backend::Memory => {
            info!("Using in-memory feed store; data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
