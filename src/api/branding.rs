use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde_json::json;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::extract::ApiPath;
use crate::entities::{branding, Branding};
use crate::uploads::{MultipartForm, UploadStore};

const LOGOS: &str = "logos";
const BACKGROUNDS: &str = "backgrounds";

async fn find_active(db: &DatabaseConnection, id: i32) -> Result<branding::Model, ApiError> {
    Branding::find_by_id(id)
        .filter(branding::Column::Status.eq(branding::STATUS_ACTIVE))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Logo not found."))
}

async fn discard_all<const N: usize>(store: &UploadStore, paths: [Option<String>; N]) {
    for path in paths.iter().flatten() {
        store.discard(path).await;
    }
}

// POST /logos
pub async fn create_logo(
    Extension(db): Extension<DatabaseConnection>,
    Extension(store): Extension<UploadStore>,
    mut form: MultipartForm,
) -> Result<impl IntoResponse, ApiError> {
    let title_text = form
        .text("titleText")
        .ok_or_else(|| ApiError::bad_request("Title text is required."))?;

    let logo = match form.take_file("logo") {
        Some(file) => Some(store.save_image(LOGOS, &file).await?),
        None => None,
    };
    let login_background = match form.take_file("loginBackground") {
        Some(file) => match store.save_image(BACKGROUNDS, &file).await {
            Ok(path) => Some(path),
            Err(e) => {
                discard_all(&store, [logo]).await;
                return Err(e);
            }
        },
        None => None,
    };

    let now = Utc::now().naive_utc();
    let record = branding::ActiveModel {
        title_text: Set(title_text),
        description: Set(form.text("description")),
        file_format: Set(form.text("fileFormat")),
        logo: Set(logo.clone()),
        login_background: Set(login_background.clone()),
        status: Set(branding::STATUS_ACTIVE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = match record.insert(&db).await {
        Ok(created) => created,
        Err(e) => {
            discard_all(&store, [logo, login_background]).await;
            return Err(e.into());
        }
    };
    info!("Created branding version {}", created.id);

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /logos
pub async fn list_logos(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let logos = Branding::find()
        .filter(branding::Column::Status.eq(branding::STATUS_ACTIVE))
        .order_by_asc(branding::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(logos))
}

// GET /logos/:id
pub async fn get_logo(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(logo_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(find_active(&db, logo_id).await?))
}

// PUT /logos/:id
pub async fn update_logo(
    Extension(db): Extension<DatabaseConnection>,
    Extension(store): Extension<UploadStore>,
    ApiPath(logo_id): ApiPath<i32>,
    mut form: MultipartForm,
) -> Result<impl IntoResponse, ApiError> {
    let existing = find_active(&db, logo_id).await?;

    let title_text = form.text("titleText");
    let description = form.text("description");
    let file_format = form.text("fileFormat");
    let logo = form.take_file("logo");
    let background = form.take_file("loginBackground");

    if title_text.is_none()
        && description.is_none()
        && file_format.is_none()
        && logo.is_none()
        && background.is_none()
    {
        return Err(ApiError::bad_request("No updates provided."));
    }

    let mut active = existing.into_active_model();
    if let Some(title_text) = title_text {
        active.title_text = Set(title_text);
    }
    if description.is_some() {
        active.description = Set(description);
    }
    if file_format.is_some() {
        active.file_format = Set(file_format);
    }
    let stored_logo = match logo {
        Some(file) => Some(store.save_image(LOGOS, &file).await?),
        None => None,
    };
    let stored_background = match background {
        Some(file) => match store.save_image(BACKGROUNDS, &file).await {
            Ok(path) => Some(path),
            Err(e) => {
                discard_all(&store, [stored_logo]).await;
                return Err(e);
            }
        },
        None => None,
    };
    if stored_logo.is_some() {
        active.logo = Set(stored_logo.clone());
    }
    if stored_background.is_some() {
        active.login_background = Set(stored_background.clone());
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = match active.update(&db).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_all(&store, [stored_logo, stored_background]).await;
            return Err(e.into());
        }
    };
    Ok(Json(updated))
}

// DELETE /logos/:id
pub async fn delete_logo(
    Extension(db): Extension<DatabaseConnection>,
    ApiPath(logo_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = find_active(&db, logo_id).await?;

    let mut active = existing.into_active_model();
    active.status = Set(branding::STATUS_DELETED.to_string());
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(&db).await?;

    info!("Soft-deleted branding version {}", logo_id);
    Ok(Json(json!({"message": "Logo deleted successfully."})))
}
