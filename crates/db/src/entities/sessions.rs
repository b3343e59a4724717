//! `SeaORM` Entity for sessions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tenant_id: String,
    pub storage_name: String,
    pub file_path: String,
    #[sea_orm(unique)]
    pub file_id: String,
    #[sea_orm(unique)]
    pub access_token: String,
    /// JSON array of permission names, e.g. `["view","edit"]`.
    #[sea_orm(column_type = "Text")]
    pub permissions: String,
    pub account: String,
    pub user: Option<String>,
    pub origin_connection_id: Option<String>,
    pub origin_page_id: Option<String>,
    pub lock_id: Option<String>,
    pub lock_expires_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub last_accessed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
