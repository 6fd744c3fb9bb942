use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::demographics::age_on;
use crate::entities::{family_member, Family, FamilyMember};

const MISSING_FIELDS: &str = "All fields except image and phone are required.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub family_id: Option<i32>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub family_id: Option<i32>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub image: Option<String>,
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))
}

async fn ensure_family_exists(db: &DatabaseConnection, family_id: i32) -> Result<(), ApiError> {
    match Family::find_by_id(family_id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::bad_request(
            "Invalid familyId: No such family exists.",
        )),
    }
}

// POST /familyMembers
pub async fn create_member(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<CreateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let family_id = payload
        .family_id
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))?;
    let name = required(payload.name)?;
    let gender = required(payload.gender)?;
    let status = required(payload.status)?;
    let birth_date = payload
        .birth_date
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))?;

    ensure_family_exists(&db, family_id).await?;

    let now = Utc::now().naive_utc();
    let new_member = family_member::ActiveModel {
        family_id: Set(family_id),
        name: Set(name),
        age: Set(Some(
            payload
                .age
                .unwrap_or_else(|| age_on(birth_date, Utc::now().date_naive())),
        )),
        gender: Set(gender),
        status: Set(status),
        birth_date: Set(birth_date),
        phone: Set(payload.phone.filter(|p| !p.trim().is_empty())),
        image: Set(payload.image.filter(|i| !i.trim().is_empty())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let member = new_member.insert(&db).await?;
    info!("Added member {} to family {}", member.id, member.family_id);
    metrics::gauge!("drms_family_members_total").increment(1.0);

    Ok((StatusCode::CREATED, Json(member)))
}

// GET /familyMembers
pub async fn list_members(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let members = FamilyMember::find()
        .order_by_asc(family_member::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(members))
}

// GET /familyMembers/:familyId
pub async fn list_family_members(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(family_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let members = FamilyMember::find()
        .filter(family_member::Column::FamilyId.eq(family_id))
        .order_by_asc(family_member::Column::Id)
        .all(&db)
        .await?;

    if members.is_empty() {
        return Err(ApiError::not_found(format!(
            "No family members found for familyId: {family_id}."
        )));
    }
    Ok(Json(members))
}

// PUT /familyMembers/:id
pub async fn update_member(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(member_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = FamilyMember::find_by_id(member_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("Family member not found."))?;

    let mut active = member.into_active_model();
    if let Some(family_id) = payload.family_id {
        ensure_family_exists(&db, family_id).await?;
        active.family_id = Set(family_id);
    }
    if let Some(name) = payload.name {
        active.name = Set(required(Some(name))?);
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(required(Some(gender))?);
    }
    if let Some(status) = payload.status {
        active.status = Set(required(Some(status))?);
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(birth_date);
        if payload.age.is_none() {
            active.age = Set(Some(age_on(birth_date, Utc::now().date_naive())));
        }
    }
    if let Some(age) = payload.age {
        active.age = Set(Some(age));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone).filter(|p| !p.trim().is_empty()));
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image).filter(|i| !i.trim().is_empty()));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&db).await?;
    Ok(Json(updated))
}

// DELETE /familyMembers/:id
pub async fn delete_member(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(member_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let res = FamilyMember::delete_by_id(member_id).exec(&db).await?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("Family member not found."));
    }

    metrics::gauge!("drms_family_members_total").decrement(1.0);
    Ok(Json(json!({"message": "Family member deleted successfully."})))
}
