use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::blob::{data_url, ChunkedBlobStore, StoredAttachment};
use crate::docstore::{AttachmentRecord, DocumentStore, StoreStats};
use crate::error::ServerError;

/// Application state shared across handlers
pub struct AppState {
    pub blobs: ChunkedBlobStore,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            blobs: ChunkedBlobStore::new(store),
        }
    }

    pub fn with_chunk_limit(store: Arc<dyn DocumentStore>, chunk_limit: usize) -> Self {
        Self {
            blobs: ChunkedBlobStore::with_chunk_limit(store, chunk_limit),
        }
    }
}

/// Attachment metadata (everything except the file content)
#[derive(Debug, Serialize)]
pub struct AttachmentMeta {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub size: i64,
    pub sha256: String,
    pub is_chunked: bool,
    pub chunk_count: i64,
    pub created_at: i64,
}

impl From<AttachmentRecord> for AttachmentMeta {
    fn from(record: AttachmentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            mime: record.mime,
            size: record.size,
            sha256: record.sha256,
            is_chunked: record.is_chunked,
            chunk_count: record.chunk_count,
            created_at: record.created_at,
        }
    }
}

/// Pull the MIME type and display name out of upload request headers.
fn upload_params(headers: &HeaderMap) -> Result<(String, String), ServerError> {
    let raw = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    // Drop media type parameters ("; charset=...") before validating
    let mime = raw.split(';').next().unwrap_or(raw).trim().to_string();
    if !data_url::is_valid_mime(&mime) {
        return Err(ServerError::InvalidRequest(format!(
            "unusable content type {:?}",
            raw
        )));
    }

    let name = headers
        .get("x-attachment-name")
        .and_then(|v| v.to_str().ok())
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "attachment".to_string());

    Ok((mime, name))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// POST /api/attachments - store a new attachment from raw body bytes
pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredAttachment>), ServerError> {
    let (mime, name) = upload_params(&headers)?;

    let stored = state.blobs.store(&name, &mime, &body).await?;
    tracing::info!(
        "uploaded attachment {} ({}, {} bytes, {} chunks)",
        stored.id,
        stored.mime,
        stored.size,
        stored.chunk_count
    );

    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/attachments/:id - reconstruct and return the original file
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let (record, bytes) = state.blobs.load_bytes(&id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", sanitize_filename(&record.name)),
        )
        .body(Body::from(bytes))
        .map_err(|e| ServerError::Internal(format!("failed to build response: {}", e)))
}

/// GET /api/attachments/:id/data-url - the reassembled data-URL as text
pub async fn attachment_data_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let url = state.blobs.load_data_url(&id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(url))
        .map_err(|e| ServerError::Internal(format!("failed to build response: {}", e)))
}

/// GET /api/attachments/:id/meta
pub async fn attachment_meta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AttachmentMeta>, ServerError> {
    let record = state.blobs.load_record(&id).await?;
    Ok(Json(record.into()))
}

/// PUT /api/attachments/:id - replace content under the same identity
pub async fn replace_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StoredAttachment>, ServerError> {
    let (mime, name) = upload_params(&headers)?;

    let stored = state.blobs.replace(&id, &name, &mime, &body).await?;
    tracing::info!("replaced attachment {} ({} bytes)", stored.id, stored.size);

    Ok(Json(stored))
}

/// DELETE /api/attachments/:id - chunks first, then the parent
pub async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.blobs.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/attachments/stats
pub async fn store_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StoreStats>, ServerError> {
    Ok(Json(state.blobs.stats().await?))
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}
