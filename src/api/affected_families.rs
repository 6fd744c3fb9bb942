use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{is_unique_violation, ApiError};
use crate::api::extract::{ApiJson, ApiPath};
use crate::demographics::{families_by_type, group_family_rows, summarize, FamilyDetail};
use crate::entities::{
    affected_family, disaster, family, family_member, AffectedFamily, Disaster, Family,
    FamilyMember,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFamilyRequest {
    pub family_id: Option<i32>,
    pub disaster_id: Option<i32>,
}

#[derive(Debug, FromQueryResult, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDisasterRow {
    pub id: i32,
    pub family_id: i32,
    pub representative: String,
    pub disaster_id: i32,
    pub disaster_type: String,
    pub disaster_date: NaiveDate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedFamiliesDetails {
    pub affected_families: Vec<FamilyDetail>,
}

// POST /affected_family
pub async fn link_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<LinkFamilyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(family_id), Some(disaster_id)) = (payload.family_id, payload.disaster_id) else {
        return Err(ApiError::bad_request(
            "Family ID and Disaster ID are required.",
        ));
    };

    if Family::find_by_id(family_id).one(&db).await?.is_none() {
        return Err(ApiError::bad_request(
            "Invalid familyId: No such family exists.",
        ));
    }
    if Disaster::find_by_id(disaster_id).one(&db).await?.is_none() {
        return Err(ApiError::bad_request(
            "Invalid disasterId: No such disaster exists.",
        ));
    }

    let already_linked = AffectedFamily::find()
        .filter(affected_family::Column::FamilyId.eq(family_id))
        .filter(affected_family::Column::DisasterId.eq(disaster_id))
        .one(&db)
        .await?
        .is_some();
    if already_linked {
        return Err(ApiError::Conflict(
            "Family is already linked to this disaster.".to_string(),
        ));
    }

    let link = affected_family::ActiveModel {
        family_id: Set(family_id),
        disaster_id: Set(disaster_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    // A concurrent request can still win the race; the unique index decides
    let link = match link.insert(&db).await {
        Ok(link) => link,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "Family is already linked to this disaster.".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::Span::current()
        .record("table", "affected_family")
        .record("action", "link_family")
        .record("business_event", "Family linked to disaster");
    metrics::gauge!("drms_affected_links_total").increment(1.0);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": link.id,
            "familyId": link.family_id,
            "disasterId": link.disaster_id,
        })),
    ))
}

// DELETE /affected_family/:id
pub async fn unlink_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(link_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let res = AffectedFamily::delete_by_id(link_id).exec(&db).await?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("Affected family link not found."));
    }

    metrics::gauge!("drms_affected_links_total").decrement(1.0);
    Ok(Json(json!({"message": "Family unlinked from disaster."})))
}

// GET /families_with_disasters
pub async fn list_families_with_disasters(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = AffectedFamily::find()
        .select_only()
        .column(affected_family::Column::Id)
        .column(affected_family::Column::FamilyId)
        .column(affected_family::Column::DisasterId)
        .column(family::Column::Representative)
        .column(disaster::Column::DisasterType)
        .column(disaster::Column::DisasterDate)
        .join(JoinType::InnerJoin, affected_family::Relation::Family.def())
        .join(JoinType::InnerJoin, affected_family::Relation::Disaster.def())
        .order_by_asc(affected_family::Column::Id)
        .into_model::<FamilyDisasterRow>()
        .all(&db)
        .await?;

    if rows.is_empty() {
        return Err(ApiError::not_found(
            "No families linked to disasters found.",
        ));
    }
    Ok(Json(rows))
}

// GET /affectedFamilies
pub async fn count_affected_families(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let total: Option<i64> = AffectedFamily::find()
        .select_only()
        .column_as(Expr::cust("COUNT(DISTINCT family_id)"), "total")
        .into_tuple()
        .one(&db)
        .await?;
    Ok(Json(json!({"total": total.unwrap_or(0)})))
}

// GET /affectedFamiliesByType
pub async fn count_affected_families_by_type(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let links: Vec<(String, i32)> = AffectedFamily::find()
        .select_only()
        .column(disaster::Column::DisasterType)
        .column(affected_family::Column::FamilyId)
        .join(JoinType::InnerJoin, affected_family::Relation::Disaster.def())
        .into_tuple()
        .all(&db)
        .await?;
    Ok(Json(families_by_type(links)))
}

/// Distinct affected families selected by `links`, each with all members.
async fn load_affected(
    db: &DatabaseConnection,
    links: Select<AffectedFamily>,
) -> Result<Vec<FamilyDetail>, ApiError> {
    let family_ids: Vec<i32> = links
        .select_only()
        .column(affected_family::Column::FamilyId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    if family_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = Family::find()
        .filter(family::Column::Id.is_in(family_ids))
        .find_also_related(FamilyMember)
        .order_by_asc(family::Column::Id)
        .order_by_asc(family_member::Column::Id)
        .all(db)
        .await?;
    Ok(group_family_rows(rows))
}

fn by_disaster_id(disaster_id: i32) -> Select<AffectedFamily> {
    AffectedFamily::find().filter(affected_family::Column::DisasterId.eq(disaster_id))
}

fn by_disaster_type(disaster_type: &str) -> Select<AffectedFamily> {
    AffectedFamily::find()
        .join(JoinType::InnerJoin, affected_family::Relation::Disaster.def())
        .filter(disaster::Column::DisasterType.eq(disaster_type))
}

// GET /affectedFamilies/count/:disasterId
pub async fn impact_by_disaster(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let families = load_affected(&db, by_disaster_id(disaster_id)).await?;
    summarize(&families, Utc::now().date_naive())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No affected families found for this disaster."))
}

// GET /affectedFamilies/count/type/:disasterType
pub async fn impact_by_type(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_type): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let families = load_affected(&db, by_disaster_type(&disaster_type)).await?;
    summarize(&families, Utc::now().date_naive())
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found("No affected families found for this disaster type.")
        })
}

// GET /affectedFamilies/details/:disasterId
pub async fn affected_family_details(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let families = load_affected(&db, by_disaster_id(disaster_id)).await?;
    if families.is_empty() {
        return Err(ApiError::not_found(
            "No affected families found for this disaster.",
        ));
    }
    Ok(Json(AffectedFamiliesDetails {
        affected_families: families,
    }))
}
