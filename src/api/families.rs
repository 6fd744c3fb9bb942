use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::demographics::{age_on, group_family_rows};
use crate::entities::{affected_family, family, family_member, AffectedFamily, Family, FamilyMember};

pub const RESIDENT: &str = "Resident";
pub const BOARDER: &str = "Boarder";

/// Enforces the residency rule: a boarder names the property owner, a
/// resident does not.
pub fn validate_residency(residency_type: &str, owner_name: Option<&str>) -> Result<(), ApiError> {
    match (residency_type, owner_name) {
        (BOARDER, None) => Err(ApiError::bad_request("Owner name is required for Boarders.")),
        (RESIDENT, Some(_)) => Err(ApiError::bad_request("Owner name must be null for Residents.")),
        (BOARDER, Some(_)) | (RESIDENT, None) => Ok(()),
        (other, _) => Err(ApiError::bad_request(format!(
            "Residency type must be {RESIDENT} or {BOARDER}, got {other}."
        ))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyRequest {
    pub representative: Option<String>,
    pub purok: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub residency_type: Option<String>,
    pub owner_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFamilyRequest {
    pub representative: Option<String>,
    pub purok: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub residency_type: Option<String>,
    pub owner_name: Option<String>,
}

// POST /families
pub async fn create_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiJson(payload): ApiJson<CreateFamilyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let representative = non_empty(payload.representative)
        .ok_or_else(|| ApiError::bad_request("Representative name is required."))?;
    let residency_type = non_empty(payload.residency_type)
        .ok_or_else(|| ApiError::bad_request("Residency type is required."))?;
    let owner_name = non_empty(payload.owner_name);
    validate_residency(&residency_type, owner_name.as_deref())?;

    let age = payload
        .age
        .or_else(|| payload.birth_date.map(|born| age_on(born, today())));

    let now = Utc::now().naive_utc();
    let new_family = family::ActiveModel {
        representative: Set(representative),
        purok: Set(payload.purok.unwrap_or_default()),
        age: Set(age),
        gender: Set(payload.gender.unwrap_or_default()),
        birth_date: Set(payload.birth_date),
        status: Set(payload.status.unwrap_or_default()),
        phone: Set(non_empty(payload.phone)),
        residency_type: Set(residency_type),
        owner_name: Set(owner_name),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_family.insert(&db).await?;

    tracing::Span::current()
        .record("table", "family")
        .record("action", "create_family")
        .record("business_event", "Family registered");
    metrics::gauge!("drms_families_total").increment(1.0);

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /families
pub async fn list_families(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let families = Family::find()
        .order_by_asc(family::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(families))
}

// GET /families/:id
pub async fn get_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(family_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let family = Family::find_by_id(family_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("Family not found."))?;
    Ok(Json(family))
}

// PUT /families/:id
pub async fn update_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(family_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateFamilyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = Family::find_by_id(family_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("Family not found."))?;

    let residency_type =
        non_empty(payload.residency_type).unwrap_or_else(|| existing.residency_type.clone());
    let owner_name = match payload.owner_name {
        Some(owner) => non_empty(Some(owner)),
        // Switching to Resident drops the previous owner
        None if residency_type == RESIDENT => None,
        None => existing.owner_name.clone(),
    };
    validate_residency(&residency_type, owner_name.as_deref())?;

    let mut active = existing.into_active_model();
    if let Some(representative) = non_empty(payload.representative) {
        active.representative = Set(representative);
    }
    if let Some(purok) = payload.purok {
        active.purok = Set(purok);
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(gender);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(non_empty(Some(phone)));
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(Some(birth_date));
        if payload.age.is_none() {
            active.age = Set(Some(age_on(birth_date, today())));
        }
    }
    if let Some(age) = payload.age {
        active.age = Set(Some(age));
    }
    active.residency_type = Set(residency_type);
    active.owner_name = Set(owner_name);
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = active.update(&db).await?;
    Ok(Json(updated))
}

// DELETE /families/:id
pub async fn delete_family(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(family_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if Family::find_by_id(family_id).one(&db).await?.is_none() {
        return Err(ApiError::not_found("Family not found."));
    }

    // Members and disaster links go with the household
    let txn = db.begin().await?;
    let members = FamilyMember::delete_many()
        .filter(family_member::Column::FamilyId.eq(family_id))
        .exec(&txn)
        .await?;
    let links = AffectedFamily::delete_many()
        .filter(affected_family::Column::FamilyId.eq(family_id))
        .exec(&txn)
        .await?;
    Family::delete_by_id(family_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::Span::current()
        .record("table", "family")
        .record("action", "delete_family")
        .record("business_event", "Family deleted");
    tracing::info!(
        "Deleted family {} with {} members and {} disaster links",
        family_id,
        members.rows_affected,
        links.rows_affected
    );
    metrics::gauge!("drms_families_total").decrement(1.0);
    metrics::gauge!("drms_family_members_total").decrement(members.rows_affected as f64);
    metrics::gauge!("drms_affected_links_total").decrement(links.rows_affected as f64);

    Ok(Json(json!({"message": "Family deleted successfully."})))
}

// GET /families-with-members/:id
pub async fn get_family_with_members(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(family_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = Family::find_by_id(family_id)
        .find_also_related(FamilyMember)
        .order_by_asc(family_member::Column::Id)
        .all(&db)
        .await?;

    group_family_rows(rows)
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Family not found."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boarder_requires_owner() {
        assert!(matches!(
            validate_residency(BOARDER, None),
            Err(ApiError::BadRequest(_))
        ));
        assert!(validate_residency(BOARDER, Some("Maria Santos")).is_ok());
    }

    #[test]
    fn resident_forbids_owner() {
        assert!(matches!(
            validate_residency(RESIDENT, Some("Maria Santos")),
            Err(ApiError::BadRequest(_))
        ));
        assert!(validate_residency(RESIDENT, None).is_ok());
    }

    #[test]
    fn unknown_residency_is_rejected() {
        assert!(validate_residency("Tenant", None).is_err());
    }

    #[test]
    fn blank_strings_count_as_absent() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" Ana ".to_string())), Some("Ana".to_string()));
    }
}
