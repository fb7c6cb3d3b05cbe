mod api;
mod blob;
mod db;
mod docstore;
mod error;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use blob::DEFAULT_CHUNK_LIMIT;
use docstore::StoreConfig;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar_vault_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get storage path from environment or use default
    let storage_path = std::env::var("SCHOLAR_VAULT_STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("scholar-vault"));

    // Build the document store (in-memory when requested, SQLite otherwise)
    let config = if std::env::var("SCHOLAR_VAULT_IN_MEMORY").as_deref() == Ok("1") {
        StoreConfig::memory()
    } else {
        StoreConfig::sqlite(storage_path.join("vault.db"))
    };
    let store = config
        .build()
        .await
        .expect("Failed to initialize document store");
    tracing::info!("Document store initialized ({:?})", config.store_type);

    // Per-fragment budget, overridable for stores with different field limits
    let chunk_limit = std::env::var("SCHOLAR_VAULT_CHUNK_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CHUNK_LIMIT);

    let state = Arc::new(AppState::with_chunk_limit(store, chunk_limit));

    // Build router
    let app = api::router()
        .with_state(state)
        // Allow large document uploads (256MB limit)
        .layer(DefaultBodyLimit::max(256 * 1024 * 1024))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    tracing::info!("Scholar Vault Server starting on http://{}", addr);
    tracing::info!("");
    tracing::info!("API Endpoints:");
    tracing::info!("  POST   /api/attachments          - Upload a file");
    tracing::info!("  GET    /api/attachments/:id      - Download a file");
    tracing::info!("  GET    /api/attachments/:id/meta - Record metadata");
    tracing::info!("  PUT    /api/attachments/:id      - Replace a file");
    tracing::info!("  DELETE /api/attachments/:id      - Delete a file");
    tracing::info!("  GET    /api/attachments/stats    - Store statistics");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app).await.expect("Server error");
}
