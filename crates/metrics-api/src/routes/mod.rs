//! Route handlers for the metrics API.

pub mod campaigns;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Liveness
        .route("/health", get(health::health))
        // Aggregator self-metrics and SLO verdict
        .route("/health/metrics/performance", get(health::performance))
        // Tenant-scoped funnel metrics
        .route(
            "/api/campaigns/:campaign_id/metrics",
            get(campaigns::campaign_metrics),
        )
}
