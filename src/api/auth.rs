use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::middleware::SESSION_COOKIE;
use crate::entities::{user, User};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Json},
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tower_cookies::{Cookie, Cookies, Key};

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Creates the administrator account on first start. Returns whether a new
/// account was created.
pub async fn ensure_admin_account(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> anyhow::Result<bool> {
    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        tracing::info!("Admin account {} already exists", username);
        return Ok(false);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;
    let now = chrono::Utc::now().naive_utc();
    user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        name: Set("Administrator".to_string()),
        role: Set(user::ROLE_ADMIN.to_string()),
        profile_picture: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Admin account {} created", username);
    Ok(true)
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Extension(key): Extension<Key>,
    cookies: Cookies,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (
        payload.username.filter(|u| !u.is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Username and password are required."));
    };

    let user = User::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(&db)
        .await?;

    let user = match user {
        Some(u) if verify_password(&password, &u.password_hash) => u,
        _ => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "login_user_failed")
                .record("error", "invalid_credentials");
            metrics::counter!("drms_logins_total", "outcome" => "failure").increment(1);
            return Err(ApiError::InvalidCredentials);
        }
    };

    let mut cookie = Cookie::new(SESSION_COOKIE, user.id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.signed(&key).add(cookie);

    tracing::Span::current()
        .record("table", "users")
        .record("action", "login_user")
        .record("user_id", user.id)
        .record("business_event", "User logged in successfully")
        .record("error", tracing::field::Empty);
    metrics::counter!("drms_logins_total", "outcome" => "success").increment(1);

    Ok(Json(user))
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);
    Json(json!({"message": "Logged out."}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("admin123").unwrap();
        assert_ne!(hash, "admin123");
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn plaintext_stored_password_never_verifies() {
        assert!(!verify_password("admin123", "admin123"));
    }
}
