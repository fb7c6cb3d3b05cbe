pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::AppState;

/// Create the attachment API router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/attachments", post(handlers::upload_attachment))
        .route("/api/attachments/stats", get(handlers::store_stats))
        .route(
            "/api/attachments/:id",
            get(handlers::download_attachment)
                .put(handlers::replace_attachment)
                .delete(handlers::delete_attachment),
        )
        .route("/api/attachments/:id/meta", get(handlers::attachment_meta))
        .route("/api/attachments/:id/data-url", get(handlers::attachment_data_url))
        .route("/health", get(handlers::health))
}
