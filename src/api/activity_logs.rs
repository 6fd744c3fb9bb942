use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::CurrentUser;
use crate::entities::{activity_log, ActivityLog};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogFilter {
    pub user_id: Option<i32>,
    pub activity_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ActivityLogFilter {
    /// Dates are whole days, both ends inclusive.
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(user_id) = self.user_id {
            condition = condition.add(activity_log::Column::UserId.eq(user_id));
        }
        if let Some(activity_type) = self.activity_type.as_deref().filter(|t| !t.is_empty()) {
            condition = condition.add(activity_log::Column::ActivityType.eq(activity_type));
        }
        if let Some(start) = self.start_date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            condition = condition.add(activity_log::Column::Timestamp.gte(start));
        }
        if let Some(end) = self
            .end_date
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            condition = condition.add(activity_log::Column::Timestamp.lt(end));
        }
        condition
    }
}

#[derive(Deserialize)]
pub struct CreateActivityLogRequest {
    pub user_id: Option<i32>,
    pub activity_type: Option<String>,
    pub description: Option<String>,
}

// GET /activity-logs
pub async fn list_activity_logs(
    Extension(db): Extension<DatabaseConnection>,
    ApiQuery(filter): ApiQuery<ActivityLogFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = ActivityLog::find()
        .filter(filter.condition())
        .order_by_desc(activity_log::Column::Timestamp)
        .order_by_desc(activity_log::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(logs))
}

// POST /activity-logs
pub async fn create_activity_log(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateActivityLogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_type = payload
        .activity_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Activity type is required."))?;

    // Only administrators may record activity on behalf of someone else
    let user_id = match payload.user_id {
        Some(user_id) if current.is_admin() => user_id,
        _ => current.id,
    };

    let entry = activity_log::ActiveModel {
        user_id: Set(Some(user_id)),
        activity_type: Set(activity_type),
        description: Set(payload.description.unwrap_or_default()),
        timestamp: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = entry.insert(&db).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /activity-logs/:userId
pub async fn list_user_activity_logs(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(user_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = ActivityLog::find()
        .filter(activity_log::Column::UserId.eq(user_id))
        .order_by_desc(activity_log::Column::Timestamp)
        .order_by_desc(activity_log::Column::Id)
        .all(&db)
        .await?;

    if logs.is_empty() {
        return Err(ApiError::not_found(
            "No activity logs found for this user",
        ));
    }
    Ok(Json(logs))
}

// DELETE /activity-logs/:id
pub async fn delete_activity_log(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(log_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let res = ActivityLog::delete_by_id(log_id).exec(&db).await?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("Activity log not found"));
    }
    Ok(Json(json!({"message": "Activity log deleted successfully"})))
}
