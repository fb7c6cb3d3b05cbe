use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::blob::BlobError;
use crate::docstore::StoreError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Blob(err) => match err {
                BlobError::Store(StoreError::NotFound(_)) => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                BlobError::EncodingOverflow { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                // Failed reconstructions and partial writes are reported as
                // explicit failures, never as a truncated file.
                BlobError::MalformedDataUrl(_)
                | BlobError::PartialChunkSet { .. }
                | BlobError::OrphanedChunkWrite { .. }
                | BlobError::DeletionOrder { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
                BlobError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, message).into_response()
    }
}
