use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Links a household to a disaster it was affected by.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "affected_family")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub family_id: i32,
    pub disaster_id: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::family::Entity",
        from = "Column::FamilyId",
        to = "super::family::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Family,
    #[sea_orm(
        belongs_to = "super::disaster::Entity",
        from = "Column::DisasterId",
        to = "super::disaster::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Disaster,
}

impl Related<super::family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Family.def()
    }
}

impl Related<super::disaster::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disaster.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
