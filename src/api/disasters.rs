use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::entities::{affected_family, disaster, AffectedFamily, Disaster};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisasterRequest {
    pub disaster_type: Option<String>,
    pub disaster_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDisasterRequest {
    pub disaster_type: Option<String>,
    pub disaster_date: Option<NaiveDate>,
}

#[derive(Debug, FromQueryResult, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterCount {
    pub disaster_type: String,
    pub disaster_date: NaiveDate,
    pub count: i64,
}

// POST /disasters
pub async fn create_disaster(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<CreateDisasterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let disaster_type = payload
        .disaster_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Disaster type is required."))?;
    let disaster_date = payload
        .disaster_date
        .ok_or_else(|| ApiError::bad_request("Disaster date is required."))?;

    let new_disaster = disaster::ActiveModel {
        disaster_type: Set(disaster_type),
        disaster_date: Set(disaster_date),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = new_disaster.insert(&db).await?;

    tracing::Span::current()
        .record("table", "disaster")
        .record("action", "create_disaster")
        .record("business_event", "Disaster recorded");
    metrics::gauge!("drms_disasters_total").increment(1.0);

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /disasters
pub async fn list_disasters(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let disasters = Disaster::find()
        .order_by_desc(disaster::Column::DisasterDate)
        .order_by_desc(disaster::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(disasters))
}

// GET /disasters/:id
pub async fn get_disaster(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let disaster = Disaster::find_by_id(disaster_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("Disaster not found."))?;
    Ok(Json(disaster))
}

// PUT /disasters/:id
pub async fn update_disaster(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateDisasterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let disaster = Disaster::find_by_id(disaster_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("Disaster not found."))?;

    let mut active = disaster.into_active_model();
    if let Some(disaster_type) = payload.disaster_type {
        let disaster_type = disaster_type.trim().to_string();
        if disaster_type.is_empty() {
            return Err(ApiError::bad_request("Disaster type is required."));
        }
        active.disaster_type = Set(disaster_type);
    }
    if let Some(disaster_date) = payload.disaster_date {
        active.disaster_date = Set(disaster_date);
    }

    let updated = active.update(&db).await?;
    Ok(Json(updated))
}

// DELETE /disasters/:id
pub async fn delete_disaster(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(disaster_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if Disaster::find_by_id(disaster_id).one(&db).await?.is_none() {
        return Err(ApiError::not_found("Disaster not found."));
    }

    let txn = db.begin().await?;
    let links = AffectedFamily::delete_many()
        .filter(affected_family::Column::DisasterId.eq(disaster_id))
        .exec(&txn)
        .await?;
    Disaster::delete_by_id(disaster_id).exec(&txn).await?;
    txn.commit().await?;

    metrics::gauge!("drms_disasters_total").decrement(1.0);
    metrics::gauge!("drms_affected_links_total").decrement(links.rows_affected as f64);

    Ok(Json(json!({"message": "Disaster deleted successfully."})))
}

// GET /disasters/count
pub async fn count_disasters(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = Disaster::find()
        .select_only()
        .column(disaster::Column::DisasterType)
        .column(disaster::Column::DisasterDate)
        .column_as(disaster::Column::Id.count(), "count")
        .group_by(disaster::Column::DisasterType)
        .group_by(disaster::Column::DisasterDate)
        .order_by_desc(disaster::Column::DisasterDate)
        .order_by_asc(disaster::Column::DisasterType)
        .into_model::<DisasterCount>()
        .all(&db)
        .await?;
    Ok(Json(counts))
}
