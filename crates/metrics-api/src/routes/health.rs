//! Health endpoints: liveness plus the aggregator performance surface.

use aggregator::{SloReport, SloTargets};
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

/// Health check endpoint.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Aggregator performance snapshot with the SLO verdict.
#[derive(Serialize)]
pub struct PerformanceResponse {
    /// SLO health status: healthy, degraded, or unhealthy.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub performance: PerformanceStats,
    pub thresholds: Thresholds,
}

#[derive(Serialize)]
pub struct PerformanceStats {
    pub events_processed: u64,
    pub events_failed: u64,
    pub batches_processed: u64,
    pub last_processed_time: Option<DateTime<Utc>>,
    pub uptime_seconds: f64,
    pub events_per_second: f64,
    pub success_rate_percent: f64,
    pub processed_events_in_memory: usize,
}

#[derive(Serialize)]
pub struct Thresholds {
    pub target_throughput: String,
    pub max_dashboard_lag: String,
    pub success_rate_target: String,
}

impl Thresholds {
    fn from_targets(targets: &SloTargets) -> Self {
        Self {
            target_throughput: format!("≥{} msg/s", targets.min_events_per_second),
            max_dashboard_lag: format!("≤{} seconds", targets.max_staleness.as_secs()),
            success_rate_target: format!("≥{}%", targets.min_success_rate),
        }
    }
}

/// `GET /health/metrics/performance`
///
/// 503 when no aggregator snapshot has ever been published (the instance
/// cannot be located); otherwise the raw numbers plus the SLO verdict.
pub async fn performance(State(state): State<AppState>) -> Result<Json<PerformanceResponse>> {
    let metrics = state
        .metrics
        .current()
        .ok_or(ApiError::AggregatorUnavailable)?;

    let now = Utc::now();
    let report = SloReport::evaluate(&metrics, &state.slo_targets, now);

    Ok(Json(PerformanceResponse {
        status: report.status.to_string(),
        timestamp: now,
        performance: PerformanceStats {
            events_processed: metrics.events_processed,
            events_failed: metrics.events_failed,
            batches_processed: metrics.batches_processed,
            last_processed_time: metrics.last_processed_time,
            uptime_seconds: metrics.uptime_seconds,
            events_per_second: metrics.events_per_second,
            success_rate_percent: metrics.success_rate,
            processed_events_in_memory: metrics.processed_events_in_memory,
        },
        thresholds: Thresholds::from_targets(&state.slo_targets),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator::MetricsHandle;
    use event_store::EventStore;

    #[test]
    fn test_threshold_strings() {
        let thresholds = Thresholds::from_targets(&SloTargets::default());
        assert_eq!(thresholds.target_throughput, "≥50 msg/s");
        assert_eq!(thresholds.max_dashboard_lag, "≤5 seconds");
        assert_eq!(thresholds.success_rate_target, "≥99%");
    }

    #[tokio::test]
    async fn test_performance_503_without_aggregator() {
        let store = EventStore::connect("sqlite::memory:").await.unwrap();
        let state = AppState::new(store, MetricsHandle::disconnected(), SloTargets::default());

        let result = performance(State(state)).await;
        assert!(matches!(result, Err(ApiError::AggregatorUnavailable)));
    }
}
