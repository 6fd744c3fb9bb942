use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::{DatabaseConnection, EntityTrait};
use tower_cookies::{Cookies, Key};

use crate::api::error::ApiError;
use crate::entities::{user, User};

pub const SESSION_COOKIE: &str = "drms_session";

/// The signed-in user, inserted into request extensions by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == user::ROLE_ADMIN
    }
}

impl From<&user::Model> for CurrentUser {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            role: model.role.clone(),
        }
    }
}

pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    Extension(key): Extension<Key>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = cookies
        .signed(&key)
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<i32>().ok());

    let Some(user_id) = user_id else {
        return ApiError::Unauthorized.into_response();
    };

    // The user may have been deleted since the cookie was issued
    match User::find_by_id(user_id).one(&db).await {
        Ok(Some(u)) => {
            tracing::Span::current().record("user_id", u.id);
            request.extensions_mut().insert(CurrentUser::from(&u));
            next.run(request).await
        }
        Ok(None) => ApiError::Unauthorized.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn admin_middleware(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Response {
    if current.is_admin() {
        next.run(request).await
    } else {
        ApiError::Forbidden("Administrator access required.".to_string()).into_response()
    }
}
