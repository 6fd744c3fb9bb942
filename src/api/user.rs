use crate::api::auth::hash_password;
use crate::api::error::{is_unique_violation, ApiError};
use crate::api::extract::ApiPath;
use crate::api::middleware::CurrentUser;
use crate::entities::{user, User};
use crate::uploads::{MultipartForm, UploadStore};
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde_json::json;

const PROFILE_PICTURES: &str = "profiles";

fn parse_role(role: Option<String>) -> Result<String, ApiError> {
    let role = role.unwrap_or_else(|| user::ROLE_USER.to_string());
    if role == user::ROLE_ADMIN || role == user::ROLE_USER {
        Ok(role)
    } else {
        Err(ApiError::bad_request(format!(
            "Role must be {} or {}, got {role}.",
            user::ROLE_ADMIN,
            user::ROLE_USER
        )))
    }
}

async fn ensure_username_free(
    db: &DatabaseConnection,
    username: &str,
    except_id: Option<i32>,
) -> Result<(), ApiError> {
    let taken = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .filter(|u| Some(u.id) != except_id);
    match taken {
        Some(_) => Err(ApiError::Conflict("Username already exists.".to_string())),
        None => Ok(()),
    }
}

fn conflict_or(e: sea_orm::DbErr) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::Conflict("Username already exists.".to_string())
    } else {
        e.into()
    }
}

// GET /users
pub async fn list_users(
    Extension(db): Extension<DatabaseConnection>,
) -> Result<impl IntoResponse, ApiError> {
    let users = User::find()
        .order_by_asc(user::Column::Id)
        .all(&db)
        .await?;
    Ok(Json(users))
}

// GET /users/:id
pub async fn get_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(user_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if current.id != user_id && !current.is_admin() {
        return Err(ApiError::Forbidden(
            "You can only view your own account.".to_string(),
        ));
    }

    let user = User::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    Ok(Json(user))
}

// POST /users
pub async fn create_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(store): Extension<UploadStore>,
    mut form: MultipartForm,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password), Some(name)) =
        (form.text("username"), form.text("password"), form.text("name"))
    else {
        return Err(ApiError::bad_request(
            "Username, password and name are required.",
        ));
    };
    let role = parse_role(form.text("role"))?;
    ensure_username_free(&db, &username, None).await?;
    let password_hash = hash_password(&password)?;

    let profile_picture = match form.take_file("profile_picture") {
        Some(file) => Some(store.save_image(PROFILE_PICTURES, &file).await?),
        None => None,
    };

    let now = chrono::Utc::now().naive_utc();
    let new_user = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        name: Set(name),
        role: Set(role),
        profile_picture: Set(profile_picture.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = match new_user.insert(&db).await {
        Ok(created) => created,
        Err(e) => {
            if let Some(path) = &profile_picture {
                store.discard(path).await;
            }
            return Err(conflict_or(e));
        }
    };

    tracing::Span::current()
        .record("table", "users")
        .record("action", "create_user")
        .record("business_event", "User account created");
    metrics::gauge!("drms_users_total").increment(1.0);

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /users/:id
pub async fn update_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(store): Extension<UploadStore>,
    ApiPath(user_id): ApiPath<i32>,
    mut form: MultipartForm,
) -> Result<impl IntoResponse, ApiError> {
    let existing = User::find_by_id(user_id)
        .one(&db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let username = form.text("username");
    let password = form.text("password");
    let name = form.text("name");
    let role = match form.text("role") {
        Some(role) => Some(parse_role(Some(role))?),
        None => None,
    };
    let picture = form.take_file("profile_picture");

    if username.is_none() && password.is_none() && name.is_none() && role.is_none() && picture.is_none() {
        return Err(ApiError::bad_request("No updates provided."));
    }

    let mut active = existing.into_active_model();
    if let Some(username) = username {
        ensure_username_free(&db, &username, Some(user_id)).await?;
        active.username = Set(username);
    }
    if let Some(password) = password {
        active.password_hash = Set(hash_password(&password)?);
    }
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(role) = role {
        active.role = Set(role);
    }
    let stored_picture = match picture {
        Some(file) => Some(store.save_image(PROFILE_PICTURES, &file).await?),
        None => None,
    };
    if stored_picture.is_some() {
        active.profile_picture = Set(stored_picture.clone());
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = match active.update(&db).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(path) = &stored_picture {
                store.discard(path).await;
            }
            return Err(conflict_or(e));
        }
    };
    Ok(Json(updated))
}

// DELETE /users/:id
pub async fn delete_user(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(user_id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    if current.id == user_id {
        return Err(ApiError::bad_request("You cannot delete your own account."));
    }

    let res = User::delete_by_id(user_id).exec(&db).await?;
    if res.rows_affected == 0 {
        return Err(ApiError::not_found("User not found."));
    }

    metrics::gauge!("drms_users_total").decrement(1.0);
    Ok(Json(json!({"message": "User deleted successfully."})))
}
