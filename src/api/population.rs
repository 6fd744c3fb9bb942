use axum::{extract::Extension, response::IntoResponse, Json};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QuerySelect, RelationTrait,
};
use serde_json::json;

use crate::api::error::ApiError;
use crate::demographics::{merge_population, PurokGenderCount};
use crate::entities::{family, family_member, Family, FamilyMember};

// GET /population
pub async fn population_by_purok(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let representatives = Family::find()
        .select_only()
        .column(family::Column::Purok)
        .column(family::Column::Gender)
        .column_as(family::Column::Id.count(), "count")
        .group_by(family::Column::Purok)
        .group_by(family::Column::Gender)
        .into_model::<PurokGenderCount>()
        .all(&db)
        .await?;

    // Members take the purok of the household they belong to
    let members = FamilyMember::find()
        .select_only()
        .column(family::Column::Purok)
        .column(family_member::Column::Gender)
        .column_as(family_member::Column::Id.count(), "count")
        .join(JoinType::InnerJoin, family_member::Relation::Family.def())
        .group_by(family::Column::Purok)
        .group_by(family_member::Column::Gender)
        .into_model::<PurokGenderCount>()
        .all(&db)
        .await?;

    let population = merge_population(&representatives, &members);
    Ok(Json(json!({ "population": population })))
}
