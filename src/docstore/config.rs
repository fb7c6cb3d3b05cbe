//! Document store configuration.

use std::path::PathBuf;
use std::sync::Arc;

use super::{DocumentStore, MemoryStore, SqliteStore, StoreResult};

/// Document store backend type
#[derive(Debug, Clone)]
pub enum StoreType {
    /// In-memory store, contents lost on shutdown
    Memory,
    /// SQLite database file
    Sqlite { path: PathBuf },
}

impl Default for StoreType {
    fn default() -> Self {
        StoreType::Sqlite {
            path: std::env::temp_dir().join("scholar-vault").join("vault.db"),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub store_type: StoreType,
}

impl StoreConfig {
    /// Create config for an in-memory store
    pub fn memory() -> Self {
        Self {
            store_type: StoreType::Memory,
        }
    }

    /// Create config for a SQLite store at the given path
    pub fn sqlite(path: PathBuf) -> Self {
        Self {
            store_type: StoreType::Sqlite { path },
        }
    }

    /// Build a document store from this config
    pub async fn build(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        match &self.store_type {
            StoreType::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreType::Sqlite { path } => {
                let db = crate::db::init_database(path).await?;
                Ok(Arc::new(SqliteStore::new(db)))
            }
        }
    }
}
