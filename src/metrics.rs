use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{AffectedFamily, Disaster, Family, FamilyMember, User};

/// Seeds the record gauges from the database. Handlers adjust them as rows
/// are created and deleted.
pub async fn init_metrics(db: &DatabaseConnection) {
    let family_count = Family::find().count(db).await.unwrap_or(0);
    metrics::gauge!("drms_families_total").set(family_count as f64);

    let member_count = FamilyMember::find().count(db).await.unwrap_or(0);
    metrics::gauge!("drms_family_members_total").set(member_count as f64);

    let disaster_count = Disaster::find().count(db).await.unwrap_or(0);
    metrics::gauge!("drms_disasters_total").set(disaster_count as f64);

    let link_count = AffectedFamily::find().count(db).await.unwrap_or(0);
    metrics::gauge!("drms_affected_links_total").set(link_count as f64);

    let user_count = User::find().count(db).await.unwrap_or(0);
    metrics::gauge!("drms_users_total").set(user_count as f64);

    tracing::info!(
        "Initialized metrics: Families={}, Members={}, Disasters={}, Links={}, Users={}",
        family_count,
        member_count,
        disaster_count,
        link_count,
        user_count
    );
}

/// `GET /metrics` in the Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}
