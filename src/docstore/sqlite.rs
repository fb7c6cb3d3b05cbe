//! SQLite document store backend (SeaORM).

use std::sync::atomic::AtomicU64;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::db::entities::{attachment, attachment_chunk, Attachment, AttachmentChunk};

use super::backend::{
    chunk_doc_id, fresh_doc_id, now_unix, AttachmentRecord, ChunkRecord, DocumentStore,
    NewAttachment, NewChunk, StoreError, StoreResult, StoreStats,
};

/// Document store backed by the `attachments` / `attachment_chunks` tables.
/// The chunk subcollection maps onto the child table; the parent's collection
/// name is stored as a column and checked on reads.
pub struct SqliteStore {
    db: DatabaseConnection,
    id_counter: AtomicU64,
}

impl SqliteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_counter: AtomicU64::new(0),
        }
    }
}

fn record_from(model: attachment::Model) -> AttachmentRecord {
    AttachmentRecord {
        id: model.id,
        name: model.name,
        mime: model.mime,
        size: model.size,
        sha256: model.sha256,
        is_chunked: model.is_chunked,
        chunk_count: model.chunk_count,
        head_fragment: model.head_fragment,
        created_at: model.created_at,
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, collection: &str, record: NewAttachment) -> StoreResult<String> {
        let id = fresh_doc_id(&record.head_fragment, &self.id_counter);
        let model = attachment::ActiveModel {
            id: Set(id.clone()),
            collection: Set(collection.to_string()),
            name: Set(record.name),
            mime: Set(record.mime),
            size: Set(record.size),
            sha256: Set(record.sha256),
            is_chunked: Set(record.is_chunked),
            chunk_count: Set(record.chunk_count),
            head_fragment: Set(record.head_fragment),
            created_at: Set(now_unix()),
        };
        model.insert(&self.db).await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<AttachmentRecord> {
        Attachment::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .filter(|m| m.collection == collection)
            .map(record_from)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))
    }

    async fn update(&self, collection: &str, id: &str, record: NewAttachment) -> StoreResult<()> {
        let model = Attachment::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .filter(|m| m.collection == collection)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        let mut active: attachment::ActiveModel = model.into();
        active.name = Set(record.name);
        active.mime = Set(record.mime);
        active.size = Set(record.size);
        active.sha256 = Set(record.sha256);
        active.is_chunked = Set(record.is_chunked);
        active.chunk_count = Set(record.chunk_count);
        active.head_fragment = Set(record.head_fragment);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn create_child(
        &self,
        parent_id: &str,
        _subcollection: &str,
        chunk: NewChunk,
    ) -> StoreResult<String> {
        let id = chunk_doc_id(parent_id, chunk.index);
        let model = attachment_chunk::ActiveModel {
            id: Set(id.clone()),
            attachment_id: Set(parent_id.to_string()),
            chunk_index: Set(Some(chunk.index)),
            data: Set(chunk.data),
        };
        model.insert(&self.db).await?;
        Ok(id)
    }

    async fn list_children(
        &self,
        parent_id: &str,
        _subcollection: &str,
        order_by: Option<&str>,
    ) -> StoreResult<Vec<ChunkRecord>> {
        let mut query = AttachmentChunk::find()
            .filter(attachment_chunk::Column::AttachmentId.eq(parent_id));
        if let Some("chunk_index") = order_by {
            query = query.order_by_asc(attachment_chunk::Column::ChunkIndex);
        }

        let models = query.all(&self.db).await?;
        Ok(models
            .into_iter()
            .map(|m| ChunkRecord {
                id: m.id,
                index: m.chunk_index,
                data: m.data,
            })
            .collect())
    }

    async fn delete_child(
        &self,
        parent_id: &str,
        _subcollection: &str,
        child_id: &str,
    ) -> StoreResult<()> {
        AttachmentChunk::delete_many()
            .filter(attachment_chunk::Column::Id.eq(child_id))
            .filter(attachment_chunk::Column::AttachmentId.eq(parent_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        Attachment::delete_many()
            .filter(attachment::Column::Id.eq(id))
            .filter(attachment::Column::Collection.eq(collection))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let attachment_count = Attachment::find().count(&self.db).await?;
        let chunk_count = AttachmentChunk::find().count(&self.db).await?;
        Ok(StoreStats {
            attachment_count,
            chunk_count,
        })
    }
}
