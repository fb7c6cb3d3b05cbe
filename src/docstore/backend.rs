//! Document store trait definition.
//!
//! Models the portal's backing database abstractly: parent records live in a
//! named collection, chunk records in a subcollection under their parent's
//! identity. Backends assign opaque identifiers on creation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Storage error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Canonical collection names
pub mod collections {
    /// Parent attachment records
    pub const ATTACHMENTS: &str = "attachments";
    /// Chunk subcollection under an attachment
    pub const CHUNKS: &str = "chunks";
}

/// A stored parent record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: String,
    pub name: String,
    pub mime: String,
    /// Byte length of the original file.
    pub size: i64,
    /// Hex SHA-256 of the original file bytes.
    pub sha256: String,
    pub is_chunked: bool,
    pub chunk_count: i64,
    /// Complete data-URL when unchunked; prefix plus the first payload slice
    /// when chunked.
    pub head_fragment: String,
    pub created_at: i64,
}

/// Fields for creating or replacing a parent record.
#[derive(Clone, Debug)]
pub struct NewAttachment {
    pub name: String,
    pub mime: String,
    pub size: i64,
    pub sha256: String,
    pub is_chunked: bool,
    pub chunk_count: i64,
    pub head_fragment: String,
}

/// A stored chunk record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: String,
    /// Position in the reconstruction, starting at 1. Legacy records may lack
    /// the field and encode the index in their identifier instead.
    pub index: Option<i64>,
    /// Raw base64 fragment, no data-URL prefix.
    pub data: String,
}

/// Fields for creating a chunk record.
#[derive(Clone, Debug)]
pub struct NewChunk {
    pub index: i64,
    pub data: String,
}

/// Store-wide record counts.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStats {
    pub attachment_count: u64,
    pub chunk_count: u64,
}

/// Document store backend trait.
///
/// Retrieval order of `list_children` is not guaranteed; callers that need
/// chunk order must sort by the resolved index themselves.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a parent record, returning its assigned id
    async fn create(&self, collection: &str, record: NewAttachment) -> StoreResult<String>;

    /// Fetch a parent record by id
    async fn get(&self, collection: &str, id: &str) -> StoreResult<AttachmentRecord>;

    /// Overwrite the stored fields of an existing parent record
    async fn update(&self, collection: &str, id: &str, record: NewAttachment) -> StoreResult<()>;

    /// Create a chunk record under a parent, returning its assigned id
    async fn create_child(
        &self,
        parent_id: &str,
        subcollection: &str,
        chunk: NewChunk,
    ) -> StoreResult<String>;

    /// List all chunk records under a parent. `order_by` names a field the
    /// backend may use to order results when it can.
    async fn list_children(
        &self,
        parent_id: &str,
        subcollection: &str,
        order_by: Option<&str>,
    ) -> StoreResult<Vec<ChunkRecord>>;

    /// Delete one chunk record. Deleting an already-missing chunk is a no-op.
    async fn delete_child(
        &self,
        parent_id: &str,
        subcollection: &str,
        child_id: &str,
    ) -> StoreResult<()>;

    /// Delete a parent record. Deleting an already-missing record is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Record counts across the store
    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Derive a fresh opaque document id from a content seed, the wall clock and
/// a per-store counter. No coordination with the backing store is needed.
pub(crate) fn fresh_doc_id(seed: &str, counter: &AtomicU64) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let n = counter.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(n.to_le_bytes());
    let digest = hasher.finalize();

    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Chunk record identifier: `<parent>-chunk-<index>`.
pub(crate) fn chunk_doc_id(parent_id: &str, index: i64) -> String {
    format!("{}-chunk-{}", parent_id, index)
}

/// Unix timestamp for record creation fields.
pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
