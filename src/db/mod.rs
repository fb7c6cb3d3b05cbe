//! Database module for SQLite persistence using SeaORM

pub mod entities;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;

/// Initialize database connection and create tables
pub async fn init_database(db_path: &Path) -> Result<DatabaseConnection, DbErr> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    tracing::info!("Connecting to database: {}", db_url);

    let db = Database::connect(&db_url).await?;

    // Create tables
    create_tables(&db).await?;

    Ok(db)
}

/// Create all tables if they don't exist
async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Attachments table (parent records; head_fragment carries the data-URL
    // head, complete when is_chunked = 0)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            name TEXT NOT NULL,
            mime TEXT NOT NULL,
            size INTEGER NOT NULL,
            sha256 TEXT NOT NULL,
            is_chunked INTEGER NOT NULL DEFAULT 0,
            chunk_count INTEGER NOT NULL DEFAULT 0,
            head_fragment TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#
        .to_string(),
    ))
    .await?;

    // Create index for collection scans
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_attachments_collection ON attachments(collection)"#
            .to_string(),
    ))
    .await?;

    // Attachment chunks table (ordered tail fragments for reconstruction;
    // chunk_index is nullable because legacy rows encode it in the id)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS attachment_chunks (
            id TEXT PRIMARY KEY,
            attachment_id TEXT NOT NULL,
            chunk_index INTEGER,
            data TEXT NOT NULL,
            FOREIGN KEY (attachment_id) REFERENCES attachments(id) ON DELETE CASCADE
        )
        "#
        .to_string(),
    ))
    .await?;

    // Create index for chunk lookups
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_attachment_chunks_parent ON attachment_chunks(attachment_id)"#
            .to_string(),
    ))
    .await?;

    tracing::info!("Database tables initialized");
    Ok(())
}
