//! Chunked blob storage.
//!
//! Files are stored as base64 data-URLs. A file whose encoded form fits the
//! per-record field budget lives entirely on its parent attachment record;
//! anything larger is split into a head fragment (prefix + first slice of the
//! payload, stored on the parent) and an ordered subcollection of prefix-free
//! tail chunks. Reads reassemble the fragments into a byte-identical data-URL.

#![allow(dead_code)] // Part of the storage API surface, not all of it used by the server yet

pub mod chunking;
pub mod data_url;
pub mod store;

use thiserror::Error;

use crate::docstore::StoreError;

pub use chunking::FragmentPlan;
pub use store::{ChunkedBlobStore, StoredAttachment};

/// Hard per-field size limit of the backing document store (~1 MiB).
pub const FIELD_SIZE_LIMIT: usize = 1_048_576;

/// Default per-fragment budget. Kept well below [`FIELD_SIZE_LIMIT`] so the
/// parent record has headroom for its sibling metadata fields.
pub const DEFAULT_CHUNK_LIMIT: usize = 600_000;

#[derive(Error, Debug)]
pub enum BlobError {
    /// The chunk limit is too small to fit even the data-URL prefix on the
    /// parent record. Raised before any write.
    #[error("chunk limit {chunk_limit} leaves no head room for a {prefix_len}-char data-URL prefix")]
    EncodingOverflow { chunk_limit: usize, prefix_len: usize },

    /// A record flagged as chunked could not be fully reconstructed. The head
    /// fragment alone is never returned as if it were the complete file.
    #[error("attachment {id} could not be fully reconstructed: {reason}")]
    PartialChunkSet { id: String, reason: String },

    #[error("malformed data-URL: {0}")]
    MalformedDataUrl(String),

    /// A chunk write failed after the parent record was created. The partial
    /// record set is rolled back on a best-effort basis; `rolled_back` tells
    /// the caller whether cleanup succeeded or manual repair is needed.
    #[error("chunk write failed for attachment {id} (rolled back: {rolled_back}): {source}")]
    OrphanedChunkWrite {
        id: String,
        rolled_back: bool,
        source: StoreError,
    },

    /// A chunk deletion failed mid-sequence. The parent record is left in
    /// place so its chunks never outlive the reference to them.
    #[error("failed to delete chunk {chunk_id} of attachment {id}: {source}")]
    DeletionOrder {
        id: String,
        chunk_id: String,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BlobResult<T> = Result<T, BlobError>;
