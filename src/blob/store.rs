//! Chunked blob store: encode/store, fetch/reassemble, replace, delete.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::docstore::{
    collections, AttachmentRecord, ChunkRecord, DocumentStore, NewAttachment, NewChunk,
    StoreError,
};

use super::chunking::{plan_fragments, split_payload};
use super::data_url;
use super::{BlobError, BlobResult, DEFAULT_CHUNK_LIMIT};

/// Summary of a stored attachment, returned by the write paths.
#[derive(Clone, Debug, Serialize)]
pub struct StoredAttachment {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub sha256: String,
    pub is_chunked: bool,
    pub chunk_count: usize,
}

/// Stores files as data-URLs split across a parent record and an ordered
/// chunk subcollection, and reassembles them byte-identically on read.
pub struct ChunkedBlobStore {
    store: Arc<dyn DocumentStore>,
    chunk_limit: usize,
}

impl ChunkedBlobStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_chunk_limit(store, DEFAULT_CHUNK_LIMIT)
    }

    pub fn with_chunk_limit(store: Arc<dyn DocumentStore>, chunk_limit: usize) -> Self {
        Self { store, chunk_limit }
    }

    pub fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }

    /// Store a file, returning the new record's summary.
    ///
    /// The parent record is persisted first so it has an identity, then the
    /// tail chunks. A failed chunk write rolls the partial record set back on
    /// a best-effort basis and surfaces the failure.
    pub async fn store(&self, name: &str, mime: &str, bytes: &[u8]) -> BlobResult<StoredAttachment> {
        let (record, fragments) = encode_fragments(name, mime, bytes, self.chunk_limit)?;
        let summary_base = record.clone();

        let id = self.store.create(collections::ATTACHMENTS, record).await?;

        if let Err((written, source)) = self.write_chunks(&id, &fragments).await {
            let rolled_back = self.rollback_partial(&id, &written, true).await;
            return Err(BlobError::OrphanedChunkWrite {
                id,
                rolled_back,
                source,
            });
        }

        tracing::debug!(
            "stored attachment {} ({} bytes, {} chunks)",
            id,
            bytes.len(),
            fragments.len()
        );

        Ok(summarize(id, &summary_base))
    }

    /// Fetch a parent record's metadata.
    pub async fn load_record(&self, id: &str) -> BlobResult<AttachmentRecord> {
        Ok(self.store.get(collections::ATTACHMENTS, id).await?)
    }

    /// Reconstruct the complete data-URL for an attachment.
    pub async fn load_data_url(&self, id: &str) -> BlobResult<String> {
        let record = self.load_record(id).await?;
        self.reassemble(&record).await
    }

    /// Reconstruct and decode an attachment, verifying the result against the
    /// stored size and content digest.
    pub async fn load_bytes(&self, id: &str) -> BlobResult<(AttachmentRecord, Vec<u8>)> {
        let record = self.load_record(id).await?;
        let url = self.reassemble(&record).await?;
        let (_, payload) = data_url::split_prefix(&url)?;

        let bytes = STANDARD.decode(payload).map_err(|e| {
            if record.is_chunked {
                BlobError::PartialChunkSet {
                    id: record.id.clone(),
                    reason: format!("reassembled payload is not valid base64: {}", e),
                }
            } else {
                BlobError::MalformedDataUrl(format!("invalid base64 payload: {}", e))
            }
        })?;

        if bytes.len() as i64 != record.size {
            return Err(BlobError::PartialChunkSet {
                id: record.id.clone(),
                reason: format!("reassembled {} bytes, expected {}", bytes.len(), record.size),
            });
        }
        if sha256_hex(&bytes) != record.sha256 {
            return Err(BlobError::PartialChunkSet {
                id: record.id.clone(),
                reason: "content digest mismatch".to_string(),
            });
        }

        Ok((record, bytes))
    }

    /// Replace an attachment's content under the same identity.
    ///
    /// Stale chunks from the previous version are deleted before any new
    /// chunk is written, so fragments of two source files never mix under one
    /// parent.
    pub async fn replace(
        &self,
        id: &str,
        name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> BlobResult<StoredAttachment> {
        self.store.get(collections::ATTACHMENTS, id).await?;

        // Plan the new layout before touching the old record set.
        let (record, fragments) = encode_fragments(name, mime, bytes, self.chunk_limit)?;
        let summary_base = record.clone();

        let stale = self
            .store
            .list_children(id, collections::CHUNKS, None)
            .await?;
        for chunk in &stale {
            self.store
                .delete_child(id, collections::CHUNKS, &chunk.id)
                .await
                .map_err(|source| BlobError::DeletionOrder {
                    id: id.to_string(),
                    chunk_id: chunk.id.clone(),
                    source,
                })?;
        }

        self.store.update(collections::ATTACHMENTS, id, record).await?;

        if let Err((written, source)) = self.write_chunks(id, &fragments).await {
            // The old content is already gone. Clean up the new chunks and
            // leave the parent in place for a retried upload; reads fail
            // loudly until then.
            let rolled_back = self.rollback_partial(id, &written, false).await;
            return Err(BlobError::OrphanedChunkWrite {
                id: id.to_string(),
                rolled_back,
                source,
            });
        }

        tracing::debug!("replaced attachment {} ({} bytes)", id, bytes.len());

        Ok(summarize(id.to_string(), &summary_base))
    }

    /// Delete an attachment: all chunks first, then the parent.
    ///
    /// A failed chunk deletion aborts the sequence so chunks never outlive
    /// their parent's reference. Deleting an already-missing record is a
    /// no-op.
    pub async fn delete(&self, id: &str) -> BlobResult<()> {
        let chunks = self
            .store
            .list_children(id, collections::CHUNKS, None)
            .await?;
        for chunk in &chunks {
            self.store
                .delete_child(id, collections::CHUNKS, &chunk.id)
                .await
                .map_err(|source| BlobError::DeletionOrder {
                    id: id.to_string(),
                    chunk_id: chunk.id.clone(),
                    source,
                })?;
        }

        self.store.delete(collections::ATTACHMENTS, id).await?;

        tracing::debug!("deleted attachment {} and {} chunks", id, chunks.len());
        Ok(())
    }

    /// Record counts of the underlying store.
    pub async fn stats(&self) -> BlobResult<crate::docstore::StoreStats> {
        Ok(self.store.stats().await?)
    }

    /// Write tail chunks under a parent, index 1..=n in payload order. On
    /// failure, reports the chunk ids already written so the caller can roll
    /// back.
    async fn write_chunks(
        &self,
        parent_id: &str,
        fragments: &[String],
    ) -> Result<(), (Vec<String>, StoreError)> {
        let mut written = Vec::with_capacity(fragments.len());
        for (i, data) in fragments.iter().enumerate() {
            let chunk = NewChunk {
                index: (i + 1) as i64,
                data: data.clone(),
            };
            match self
                .store
                .create_child(parent_id, collections::CHUNKS, chunk)
                .await
            {
                Ok(child_id) => written.push(child_id),
                Err(source) => return Err((written, source)),
            }
        }
        Ok(())
    }

    /// Best-effort removal of a partially-written record set. Returns whether
    /// every delete succeeded.
    async fn rollback_partial(
        &self,
        parent_id: &str,
        written: &[String],
        delete_parent: bool,
    ) -> bool {
        let mut clean = true;
        for child_id in written {
            if let Err(e) = self
                .store
                .delete_child(parent_id, collections::CHUNKS, child_id)
                .await
            {
                tracing::error!(
                    "rollback: failed to delete chunk {} of {}: {}",
                    child_id,
                    parent_id,
                    e
                );
                clean = false;
            }
        }
        if delete_parent {
            if let Err(e) = self.store.delete(collections::ATTACHMENTS, parent_id).await {
                tracing::error!("rollback: failed to delete attachment {}: {}", parent_id, e);
                clean = false;
            }
        }
        clean
    }

    async fn reassemble(&self, record: &AttachmentRecord) -> BlobResult<String> {
        // Reject a corrupt head before any slicing or concatenation.
        data_url::split_prefix(&record.head_fragment)?;

        if !record.is_chunked {
            return Ok(record.head_fragment.clone());
        }

        let chunks = self
            .store
            .list_children(&record.id, collections::CHUNKS, Some("chunk_index"))
            .await?;
        if chunks.is_empty() {
            return Err(BlobError::PartialChunkSet {
                id: record.id.clone(),
                reason: "no chunk records found".to_string(),
            });
        }

        let mut resolved = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match resolve_chunk_index(chunk) {
                Some(index) => resolved.push((index, chunk)),
                None => {
                    return Err(BlobError::PartialChunkSet {
                        id: record.id.clone(),
                        reason: format!("chunk {} has no resolvable index", chunk.id),
                    })
                }
            }
        }

        // Retrieval order is never trusted.
        resolved.sort_by_key(|(index, _)| *index);

        for (position, (index, _)) in resolved.iter().enumerate() {
            let expected = (position + 1) as i64;
            if *index != expected {
                return Err(BlobError::PartialChunkSet {
                    id: record.id.clone(),
                    reason: format!("expected chunk index {}, found {}", expected, index),
                });
            }
        }
        if record.chunk_count > 0 && resolved.len() as i64 != record.chunk_count {
            return Err(BlobError::PartialChunkSet {
                id: record.id.clone(),
                reason: format!(
                    "expected {} chunks, found {}",
                    record.chunk_count,
                    resolved.len()
                ),
            });
        }

        let total = record.head_fragment.len()
            + resolved.iter().map(|(_, c)| c.data.len()).sum::<usize>();
        let mut result = String::with_capacity(total);
        result.push_str(&record.head_fragment);
        for (_, chunk) in &resolved {
            result.push_str(&chunk.data);
        }
        Ok(result)
    }
}

/// Resolve a chunk's position in the reconstruction. The stored index field
/// is authoritative; parsing the trailing `chunk-<n>` out of the record id
/// covers legacy records written without the field.
fn resolve_chunk_index(chunk: &ChunkRecord) -> Option<i64> {
    if let Some(index) = chunk.index {
        return Some(index);
    }
    let (_, suffix) = chunk.id.rsplit_once("chunk-")?;
    suffix.parse().ok()
}

/// Encode a file into its parent record fields and tail fragments.
fn encode_fragments(
    name: &str,
    mime: &str,
    bytes: &[u8],
    chunk_limit: usize,
) -> BlobResult<(NewAttachment, Vec<String>)> {
    if !data_url::is_valid_mime(mime) {
        return Err(BlobError::MalformedDataUrl(format!(
            "invalid mime type {:?}",
            mime
        )));
    }

    let payload = STANDARD.encode(bytes);
    let prefix = data_url::prefix(mime);
    let plan = plan_fragments(payload.len(), prefix.len(), chunk_limit)?;
    let (head, tails) = split_payload(&payload, &plan);

    let record = NewAttachment {
        name: name.to_string(),
        mime: mime.to_string(),
        size: bytes.len() as i64,
        sha256: sha256_hex(bytes),
        is_chunked: plan.is_chunked(),
        chunk_count: plan.chunk_count() as i64,
        head_fragment: format!("{}{}", prefix, head),
    };
    let fragments = tails.into_iter().map(|s| s.to_string()).collect();

    Ok((record, fragments))
}

fn summarize(id: String, record: &NewAttachment) -> StoredAttachment {
    StoredAttachment {
        id,
        name: record.name.clone(),
        mime: record.mime.clone(),
        size: record.size as u64,
        sha256: record.sha256.clone(),
        is_chunked: record.is_chunked,
        chunk_count: record.chunk_count as usize,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::docstore::{MemoryStore, StoreResult, StoreStats};

    fn blob_store(chunk_limit: usize) -> (Arc<MemoryStore>, ChunkedBlobStore) {
        let store = Arc::new(MemoryStore::new());
        let blobs = ChunkedBlobStore::with_chunk_limit(store.clone(), chunk_limit);
        (store, blobs)
    }

    fn sample_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_round_trip_unchunked() {
        let (_, blobs) = blob_store(DEFAULT_CHUNK_LIMIT);
        let bytes = b"short essay".to_vec();

        let stored = blobs.store("essay.txt", "text/plain", &bytes).await.unwrap();
        assert!(!stored.is_chunked);
        assert_eq!(stored.chunk_count, 0);

        let url = blobs.load_data_url(&stored.id).await.unwrap();
        assert_eq!(url, data_url::encode("text/plain", &bytes));

        let (record, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, bytes);
        assert_eq!(record.mime, "text/plain");
    }

    #[tokio::test]
    async fn test_round_trip_chunked() {
        let (store, blobs) = blob_store(64);
        let bytes = sample_bytes(300);

        let stored = blobs.store("photo.png", "image/png", &bytes).await.unwrap();
        assert!(stored.is_chunked);
        assert!(stored.chunk_count > 1);

        let (_, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, bytes);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.attachment_count, 1);
        assert_eq!(stats.chunk_count, stored.chunk_count as u64);
    }

    #[tokio::test]
    async fn test_boundary_between_unchunked_and_chunked() {
        let prefix_len = data_url::prefix("application/pdf").len();

        // 30 bytes encode to exactly 40 base64 chars.
        let bytes = sample_bytes(30);
        let exact_limit = prefix_len + 40;

        let (_, blobs) = blob_store(exact_limit);
        let stored = blobs.store("doc.pdf", "application/pdf", &bytes).await.unwrap();
        assert!(!stored.is_chunked);

        let (_, blobs) = blob_store(exact_limit - 1);
        let stored = blobs.store("doc.pdf", "application/pdf", &bytes).await.unwrap();
        assert!(stored.is_chunked);
        assert_eq!(stored.chunk_count, 1);

        let (_, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, bytes);
    }

    #[tokio::test]
    async fn test_large_pdf_scenario() {
        // 1,500,000 bytes -> 2,000,000 base64 chars -> head + 3 chunks at the
        // default 600,000 budget.
        let (store, blobs) = blob_store(600_000);
        let bytes = sample_bytes(1_500_000);

        let stored = blobs
            .store("transcript.pdf", "application/pdf", &bytes)
            .await
            .unwrap();
        assert!(stored.is_chunked);
        assert_eq!(stored.chunk_count, 3);

        let record = blobs.load_record(&stored.id).await.unwrap();
        assert!(record.head_fragment.len() <= 600_000);

        let chunks = store
            .list_children(&stored.id, collections::CHUNKS, None)
            .await
            .unwrap();
        let mut indices: Vec<i64> = chunks.iter().filter_map(|c| c.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);

        let (_, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded.len(), 1_500_000);
        assert_eq!(decoded, bytes);
    }

    #[tokio::test]
    async fn test_decoding_ignores_retrieval_order() {
        let (store, blobs) = blob_store(64);
        let bytes = sample_bytes(400);
        let stored = blobs.store("a.bin", "application/octet-stream", &bytes).await.unwrap();

        // Rewrite the chunk set in reverse order; the in-memory backend
        // returns insertion order, so retrieval is now backwards.
        let mut chunks = store
            .list_children(&stored.id, collections::CHUNKS, None)
            .await
            .unwrap();
        chunks.sort_by_key(|c| std::cmp::Reverse(c.index));
        for chunk in &chunks {
            store
                .delete_child(&stored.id, collections::CHUNKS, &chunk.id)
                .await
                .unwrap();
        }
        for chunk in &chunks {
            store
                .create_child(
                    &stored.id,
                    collections::CHUNKS,
                    NewChunk {
                        index: chunk.index.unwrap(),
                        data: chunk.data.clone(),
                    },
                )
                .await
                .unwrap();
        }

        let (_, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, bytes);
    }

    #[tokio::test]
    async fn test_legacy_chunks_without_index_field() {
        let (store, blobs) = blob_store(64);
        let bytes = sample_bytes(300);
        let stored = blobs.store("old.bin", "application/octet-stream", &bytes).await.unwrap();

        // Strip the index fields, keeping only the `-chunk-<n>` id suffix the
        // older portal versions relied on.
        let chunks = store
            .list_children(&stored.id, collections::CHUNKS, None)
            .await
            .unwrap();
        for chunk in &chunks {
            store
                .delete_child(&stored.id, collections::CHUNKS, &chunk.id)
                .await
                .unwrap();
        }
        for chunk in chunks.iter().rev() {
            store.insert_legacy_child(&stored.id, collections::CHUNKS, &chunk.id, &chunk.data);
        }

        let (_, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, bytes);
    }

    #[tokio::test]
    async fn test_chunked_record_with_no_chunks_is_an_error() {
        let (store, blobs) = blob_store(64);
        let id = store
            .create(
                collections::ATTACHMENTS,
                NewAttachment {
                    name: "broken.pdf".to_string(),
                    mime: "application/pdf".to_string(),
                    size: 100,
                    sha256: "00".repeat(32),
                    is_chunked: true,
                    chunk_count: 2,
                    head_fragment: "data:application/pdf;base64,AAAA".to_string(),
                },
            )
            .await
            .unwrap();

        let err = blobs.load_data_url(&id).await.unwrap_err();
        assert!(matches!(err, BlobError::PartialChunkSet { .. }));
    }

    #[tokio::test]
    async fn test_missing_chunk_is_an_error() {
        let (store, blobs) = blob_store(64);
        let bytes = sample_bytes(400);
        let stored = blobs.store("a.bin", "application/octet-stream", &bytes).await.unwrap();
        assert!(stored.chunk_count >= 2);

        let chunks = store
            .list_children(&stored.id, collections::CHUNKS, None)
            .await
            .unwrap();
        let first = chunks.iter().find(|c| c.index == Some(1)).unwrap();
        store
            .delete_child(&stored.id, collections::CHUNKS, &first.id)
            .await
            .unwrap();

        let err = blobs.load_data_url(&stored.id).await.unwrap_err();
        assert!(matches!(err, BlobError::PartialChunkSet { .. }));
    }

    #[tokio::test]
    async fn test_corrupted_chunk_fails_digest_check() {
        let (store, blobs) = blob_store(64);
        let bytes = sample_bytes(400);
        let stored = blobs.store("a.bin", "application/octet-stream", &bytes).await.unwrap();

        let chunks = store
            .list_children(&stored.id, collections::CHUNKS, None)
            .await
            .unwrap();
        let victim = chunks.iter().find(|c| c.index == Some(2)).unwrap();
        store
            .delete_child(&stored.id, collections::CHUNKS, &victim.id)
            .await
            .unwrap();
        store
            .create_child(
                &stored.id,
                collections::CHUNKS,
                NewChunk {
                    index: 2,
                    // Same length, different content: the payload still
                    // decodes, so only the digest check can catch it.
                    data: "A".repeat(victim.data.len()),
                },
            )
            .await
            .unwrap();

        let err = blobs.load_bytes(&stored.id).await.unwrap_err();
        assert!(matches!(err, BlobError::PartialChunkSet { .. }));
    }

    #[tokio::test]
    async fn test_malformed_head_fragment_is_rejected() {
        let (store, blobs) = blob_store(64);
        let id = store
            .create(
                collections::ATTACHMENTS,
                NewAttachment {
                    name: "bad.bin".to_string(),
                    mime: "application/octet-stream".to_string(),
                    size: 4,
                    sha256: "00".repeat(32),
                    is_chunked: false,
                    chunk_count: 0,
                    head_fragment: "not-a-data-url".to_string(),
                },
            )
            .await
            .unwrap();

        let err = blobs.load_data_url(&id).await.unwrap_err();
        assert!(matches!(err, BlobError::MalformedDataUrl(_)));
    }

    #[tokio::test]
    async fn test_overflowing_prefix_aborts_before_any_write() {
        let (store, blobs) = blob_store(10);
        let err = blobs
            .store("doc.pdf", "application/pdf", &sample_bytes(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::EncodingOverflow { .. }));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.attachment_count, 0);
        assert_eq!(stats.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_mime_is_rejected() {
        let (_, blobs) = blob_store(DEFAULT_CHUNK_LIMIT);
        let err = blobs.store("x", "not a mime", b"abc").await.unwrap_err();
        assert!(matches!(err, BlobError::MalformedDataUrl(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_chunks_then_parent_and_is_idempotent() {
        let (store, blobs) = blob_store(64);
        let stored = blobs
            .store("a.bin", "application/octet-stream", &sample_bytes(300))
            .await
            .unwrap();

        blobs.delete(&stored.id).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.attachment_count, 0);
        assert_eq!(stats.chunk_count, 0);
        assert!(matches!(
            blobs.load_record(&stored.id).await,
            Err(BlobError::Store(StoreError::NotFound(_)))
        ));

        // Second delete of a missing record is a no-op
        blobs.delete(&stored.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_deletes_stale_chunks_first() {
        let (store, blobs) = blob_store(64);
        let original = sample_bytes(400);
        let stored = blobs
            .store("draft.bin", "application/octet-stream", &original)
            .await
            .unwrap();
        assert!(stored.is_chunked);

        // 9 bytes encode to 12 chars, well within the 64-char budget.
        let replacement = b"ok: final".to_vec();
        let replaced = blobs
            .replace(&stored.id, "final.txt", "text/plain", &replacement)
            .await
            .unwrap();
        assert_eq!(replaced.id, stored.id);
        assert!(!replaced.is_chunked);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.chunk_count, 0);

        let (record, decoded) = blobs.load_bytes(&stored.id).await.unwrap();
        assert_eq!(decoded, replacement);
        assert_eq!(record.name, "final.txt");
        assert_eq!(record.mime, "text/plain");
    }

    #[tokio::test]
    async fn test_replace_missing_record_fails() {
        let (_, blobs) = blob_store(64);
        let err = blobs
            .replace("nope", "x.txt", "text/plain", b"abc")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Store(StoreError::NotFound(_))));
    }

    /// Wrapper that fails chunk writes after a set number of successes.
    struct FailingChunkWrites {
        inner: MemoryStore,
        remaining: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FailingChunkWrites {
        async fn create(&self, collection: &str, record: NewAttachment) -> StoreResult<String> {
            self.inner.create(collection, record).await
        }
        async fn get(&self, collection: &str, id: &str) -> StoreResult<AttachmentRecord> {
            self.inner.get(collection, id).await
        }
        async fn update(
            &self,
            collection: &str,
            id: &str,
            record: NewAttachment,
        ) -> StoreResult<()> {
            self.inner.update(collection, id, record).await
        }
        async fn create_child(
            &self,
            parent_id: &str,
            subcollection: &str,
            chunk: NewChunk,
        ) -> StoreResult<String> {
            if self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                return Err(StoreError::Other("synthetic chunk write failure".to_string()));
            }
            self.inner.create_child(parent_id, subcollection, chunk).await
        }
        async fn list_children(
            &self,
            parent_id: &str,
            subcollection: &str,
            order_by: Option<&str>,
        ) -> StoreResult<Vec<ChunkRecord>> {
            self.inner.list_children(parent_id, subcollection, order_by).await
        }
        async fn delete_child(
            &self,
            parent_id: &str,
            subcollection: &str,
            child_id: &str,
        ) -> StoreResult<()> {
            self.inner.delete_child(parent_id, subcollection, child_id).await
        }
        async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
            self.inner.delete(collection, id).await
        }
        async fn stats(&self) -> StoreResult<StoreStats> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_write_rolls_back_parent() {
        let store = Arc::new(FailingChunkWrites {
            inner: MemoryStore::new(),
            remaining: AtomicUsize::new(1),
        });
        let blobs = ChunkedBlobStore::with_chunk_limit(store.clone(), 64);

        let err = blobs
            .store("a.bin", "application/octet-stream", &sample_bytes(400))
            .await
            .unwrap_err();
        match err {
            BlobError::OrphanedChunkWrite { rolled_back, .. } => assert!(rolled_back),
            other => panic!("expected OrphanedChunkWrite, got {:?}", other),
        }

        // Rollback removed both the written chunk and the parent record.
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.attachment_count, 0);
        assert_eq!(stats.chunk_count, 0);
    }
}
