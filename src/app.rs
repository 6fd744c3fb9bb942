use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use tower_cookies::Key;
use tower_http::services::ServeDir;

use crate::api;
use crate::config::Config;
use crate::uploads::{UploadStore, PUBLIC_PREFIX};

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the HTTP application. Prometheus metrics are attached by the binary
/// since the recorder is process-global.
pub fn app(db: DatabaseConnection, config: &Config, session_key: Key) -> Router {
    let store = UploadStore::new(config.upload_dir.clone());

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/users/login", post(api::auth::login))
        .route("/users/logout", post(api::auth::logout))
        // The login screen renders branding before anybody is signed in
        .route("/logos", get(api::branding::list_logos))
        .route("/logos/:id", get(api::branding::get_logo));

    let admin_routes = Router::new()
        .route(
            "/users",
            get(api::user::list_users).post(api::user::create_user),
        )
        .route(
            "/users/:id",
            put(api::user::update_user).delete(api::user::delete_user),
        )
        .route(
            "/activity-logs/:id",
            delete(api::activity_logs::delete_activity_log),
        )
        .route("/logos", post(api::branding::create_logo))
        .route(
            "/logos/:id",
            put(api::branding::update_logo).delete(api::branding::delete_logo),
        )
        .route_layer(axum::middleware::from_fn(api::middleware::admin_middleware));

    let protected_routes = Router::new()
        .route(
            "/families",
            get(api::families::list_families).post(api::families::create_family),
        )
        .route(
            "/families/:id",
            get(api::families::get_family)
                .put(api::families::update_family)
                .delete(api::families::delete_family),
        )
        .route(
            "/families-with-members/:id",
            get(api::families::get_family_with_members),
        )
        .route(
            "/familyMembers",
            get(api::family_members::list_members).post(api::family_members::create_member),
        )
        // GET takes a family id, PUT and DELETE a member id
        .route(
            "/familyMembers/:id",
            get(api::family_members::list_family_members)
                .put(api::family_members::update_member)
                .delete(api::family_members::delete_member),
        )
        .route(
            "/disasters",
            get(api::disasters::list_disasters).post(api::disasters::create_disaster),
        )
        .route("/disasters/count", get(api::disasters::count_disasters))
        .route(
            "/disasters/:id",
            get(api::disasters::get_disaster)
                .put(api::disasters::update_disaster)
                .delete(api::disasters::delete_disaster),
        )
        .route(
            "/affected_family",
            post(api::affected_families::link_family),
        )
        .route(
            "/affected_family/:id",
            delete(api::affected_families::unlink_family),
        )
        .route(
            "/families_with_disasters",
            get(api::affected_families::list_families_with_disasters),
        )
        .route(
            "/affectedFamilies",
            get(api::affected_families::count_affected_families),
        )
        .route(
            "/affectedFamilies/count/:id",
            get(api::affected_families::impact_by_disaster),
        )
        .route(
            "/affectedFamilies/count/type/:disaster_type",
            get(api::affected_families::impact_by_type),
        )
        .route(
            "/affectedFamilies/details/:id",
            get(api::affected_families::affected_family_details),
        )
        .route(
            "/affectedFamiliesByType",
            get(api::affected_families::count_affected_families_by_type),
        )
        .route("/population", get(api::population::population_by_purok))
        .route("/users/:id", get(api::user::get_user))
        .route(
            "/activity-logs",
            get(api::activity_logs::list_activity_logs)
                .post(api::activity_logs::create_activity_log),
        )
        // GET takes a user id, DELETE a log id
        .route(
            "/activity-logs/:id",
            get(api::activity_logs::list_user_activity_logs),
        )
        .merge(admin_routes)
        .route_layer(axum::middleware::from_fn(api::middleware::auth_middleware));

    let cors_origin = config.cors_origin.parse::<HeaderValue>().unwrap_or_else(|_| {
        tracing::warn!("CORS_ORIGIN {} is not a valid header value", config.cors_origin);
        HeaderValue::from_static("http://localhost:3000")
    });

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(store.root()))
        .layer(Extension(db))
        .layer(Extension(session_key))
        .layer(Extension(store))
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /families"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Handlers fill in the empty fields
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .layer(axum::extract::DefaultBodyLimit::max(config.max_upload_bytes))
}
