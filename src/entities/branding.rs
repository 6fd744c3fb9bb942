use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DELETED: &str = "deleted";

/// One version of the logo, login background and title shown by the client.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "branding")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title_text: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub file_format: Option<String>,
    pub logo: Option<String>,
    pub login_background: Option<String>,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
