use drms_server::{api, app::app, config::Config, migrator};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use tower_cookies::Key;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    drms_server::telemetry::init_telemetry("drms-server")?;

    let config = Config::from_env()?;

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url).await?;

    migrator::Migrator::up(&db, None).await?;

    let admin_password = match &config.admin_password {
        Some(password) => password.clone(),
        None => {
            tracing::warn!("ADMIN_PASSWORD is not set, seeding the default admin password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        }
    };
    api::auth::ensure_admin_account(&db, &config.admin_username, &admin_password).await?;

    drms_server::metrics::init_metrics(&db).await;

    let session_key = match &config.session_secret {
        Some(secret) => Key::try_from(secret.as_bytes())?,
        None => {
            tracing::warn!("SESSION_SECRET is not set, sessions will not survive a restart");
            Key::generate()
        }
    };

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let app = app(db, &config, session_key)
        .layer(prometheus_layer)
        .merge(drms_server::metrics::metrics_router(metric_handle));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
