use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "disaster")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub disaster_type: String,
    pub disaster_date: Date,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::affected_family::Entity")]
    AffectedFamily,
}

impl Related<super::affected_family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedFamily.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
