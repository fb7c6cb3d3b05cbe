//! In-memory document store backend.
//!
//! Backs tests and ephemeral runs. Children are returned in insertion order;
//! like any backend, retrieval order carries no meaning and callers must sort
//! by the resolved chunk index.

use std::sync::atomic::AtomicU64;

use dashmap::DashMap;

use super::backend::{
    chunk_doc_id, fresh_doc_id, now_unix, AttachmentRecord, ChunkRecord, DocumentStore,
    NewAttachment, NewChunk, StoreError, StoreResult, StoreStats,
};
use async_trait::async_trait;

pub struct MemoryStore {
    /// Parent records keyed by (collection, id)
    documents: DashMap<(String, String), AttachmentRecord>,
    /// Chunk records keyed by (parent id, subcollection)
    children: DashMap<(String, String), Vec<ChunkRecord>>,
    id_counter: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            children: DashMap::new(),
            id_counter: AtomicU64::new(0),
        }
    }

    /// Insert a chunk record without an index field, as written by older
    /// portal versions that encoded the index in the record id only.
    #[cfg(test)]
    pub(crate) fn insert_legacy_child(
        &self,
        parent_id: &str,
        subcollection: &str,
        child_id: &str,
        data: &str,
    ) {
        self.children
            .entry((parent_id.to_string(), subcollection.to_string()))
            .or_default()
            .push(ChunkRecord {
                id: child_id.to_string(),
                index: None,
                data: data.to_string(),
            });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, record: NewAttachment) -> StoreResult<String> {
        let id = fresh_doc_id(&record.head_fragment, &self.id_counter);
        self.documents.insert(
            (collection.to_string(), id.clone()),
            AttachmentRecord {
                id: id.clone(),
                name: record.name,
                mime: record.mime,
                size: record.size,
                sha256: record.sha256,
                is_chunked: record.is_chunked,
                chunk_count: record.chunk_count,
                head_fragment: record.head_fragment,
                created_at: now_unix(),
            },
        );
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<AttachmentRecord> {
        self.documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))
    }

    async fn update(&self, collection: &str, id: &str, record: NewAttachment) -> StoreResult<()> {
        let mut entry = self
            .documents
            .get_mut(&(collection.to_string(), id.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;
        entry.name = record.name;
        entry.mime = record.mime;
        entry.size = record.size;
        entry.sha256 = record.sha256;
        entry.is_chunked = record.is_chunked;
        entry.chunk_count = record.chunk_count;
        entry.head_fragment = record.head_fragment;
        Ok(())
    }

    async fn create_child(
        &self,
        parent_id: &str,
        subcollection: &str,
        chunk: NewChunk,
    ) -> StoreResult<String> {
        let id = chunk_doc_id(parent_id, chunk.index);
        self.children
            .entry((parent_id.to_string(), subcollection.to_string()))
            .or_default()
            .push(ChunkRecord {
                id: id.clone(),
                index: Some(chunk.index),
                data: chunk.data,
            });
        Ok(id)
    }

    async fn list_children(
        &self,
        parent_id: &str,
        subcollection: &str,
        _order_by: Option<&str>,
    ) -> StoreResult<Vec<ChunkRecord>> {
        Ok(self
            .children
            .get(&(parent_id.to_string(), subcollection.to_string()))
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    async fn delete_child(
        &self,
        parent_id: &str,
        subcollection: &str,
        child_id: &str,
    ) -> StoreResult<()> {
        if let Some(mut entry) = self
            .children
            .get_mut(&(parent_id.to_string(), subcollection.to_string()))
        {
            entry.retain(|c| c.id != child_id);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.documents
            .remove(&(collection.to_string(), id.to_string()));
        Ok(())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let chunk_count = self.children.iter().map(|e| e.len() as u64).sum();
        Ok(StoreStats {
            attachment_count: self.documents.len() as u64,
            chunk_count,
        })
    }
}
