//! Item persistence and storage backend selection.

use std::str::FromStr;

use thiserror::Error;

pub mod items;

pub use items::{ItemRepository, MemoryItemRepository, PgItemRepository, SharedItemRepository};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item {0} not found")]
    NotFound(i32),
    #[error("database error: {0}")]
    Database(#[from] rocket_db_pools::sqlx::Error),
}

/// Where users and items live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local maps; contents vanish on restart.
    Memory,
}

#[derive(Debug, Error)]
#[error("unsupported storage backend '{0}'; expected 'postgres' or 'memory'")]
pub struct UnknownBackend(pub String);

impl StorageBackend {
    pub fn from_env() -> Result<Self, UnknownBackend> {
        match std::env::var("ITEMS_STORAGE") {
            Ok(value) => value.parse(),
            Err(_) => Ok(StorageBackend::Postgres),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}
