use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "family")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub representative: String,
    pub purok: String,
    pub age: Option<i32>,
    pub gender: String,
    pub birth_date: Option<Date>,
    pub status: String,
    pub phone: Option<String>,
    pub residency_type: String,
    pub owner_name: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::family_member::Entity")]
    FamilyMember,
    #[sea_orm(has_many = "super::affected_family::Entity")]
    AffectedFamily,
}

impl Related<super::family_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FamilyMember.def()
    }
}

impl Related<super::affected_family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedFamily.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
