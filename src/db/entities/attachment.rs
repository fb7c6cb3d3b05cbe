//! Attachment (parent record) entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub collection: String,
    pub name: String,
    pub mime: String,
    pub size: i64,
    pub sha256: String,       // hex digest of the original bytes
    pub is_chunked: bool,
    pub chunk_count: i64,
    pub head_fragment: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attachment_chunk::Entity")]
    Chunks,
}

impl Related<super::attachment_chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
