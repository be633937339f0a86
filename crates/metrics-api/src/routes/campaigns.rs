//! Campaign metrics endpoint.

use analytics::MetricsQuery;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Query parameters for `GET /api/campaigns/{campaign_id}/metrics`.
#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    #[serde(rename = "windowMinutes", default = "default_window_minutes")]
    pub window_minutes: i64,
    #[serde(rename = "includeTimeseries", default)]
    pub include_timeseries: bool,
}

fn default_window_minutes() -> i64 {
    60
}

/// Tenant-scoped funnel metrics for one campaign.
///
/// The tenant identity comes from the `X-Tenant-Id` header injected by the
/// upstream auth gateway. Responses disable intermediary caching: staleness
/// budgets are measured end to end, a cached funnel defeats them.
pub async fn campaign_metrics(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    Query(params): Query<MetricsParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let tenant_id = tenant_id_from_headers(&headers)?;

    let query = MetricsQuery::new(params.window_minutes, params.include_timeseries);
    let metrics =
        analytics::get_campaign_metrics(&state.store, &campaign_id, &tenant_id, &query).await?;

    let cache_headers = [
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, max-age=0"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
    ];
    Ok((cache_headers, Json(metrics)).into_response())
}

fn tenant_id_from_headers(headers: &HeaderMap) -> Result<String> {
    headers
        .get("x-tenant-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or(ApiError::MissingTenant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator::{MetricsHandle, SloTargets};
    use axum::http::StatusCode;
    use chrono::Utc;
    use event_store::models::{Campaign, CampaignStatus, Tenant};
    use event_store::{campaign, tenant, EventStore};

    async fn seeded_state() -> AppState {
        let store = EventStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();
        tenant::create_tenant(
            store.pool(),
            &Tenant {
                id: "t1".to_string(),
                name: "Acme".to_string(),
                active: true,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        campaign::create_campaign(
            store.pool(),
            &Campaign {
                id: "c1".to_string(),
                tenant_id: "t1".to_string(),
                name: "Launch".to_string(),
                status: CampaignStatus::Sending,
                channels: "email".to_string(),
                scheduled_at: None,
                started_at: None,
                finished_at: None,
                sent_count: 0,
                success_count: 0,
                failed_count: 0,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        AppState::new(store, MetricsHandle::disconnected(), SloTargets::default())
    }

    fn tenant_headers(tenant_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_str(tenant_id).unwrap());
        headers
    }

    fn default_params() -> MetricsParams {
        MetricsParams {
            window_minutes: 60,
            include_timeseries: false,
        }
    }

    #[tokio::test]
    async fn test_metrics_response_disables_caching() {
        let state = seeded_state().await;

        // A campaign with no events still answers 200 with zeroed metrics.
        let response = campaign_metrics(
            State(state),
            Path("c1".to_string()),
            Query(default_params()),
            tenant_headers("t1"),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store, no-cache, max-age=0"
        );
        assert_eq!(response.headers().get(header::PRAGMA).unwrap(), "no-cache");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["campaignId"], "c1");
        assert_eq!(json["funnel"]["sent"], 0);
        assert_eq!(json["deliveryRate"], 0.0);
        assert!(json.get("timeseries").is_none());
    }

    #[tokio::test]
    async fn test_metrics_status_wiring() {
        let state = seeded_state().await;

        // Missing tenant header.
        let err = campaign_metrics(
            State(state.clone()),
            Path("c1".to_string()),
            Query(default_params()),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        // Unknown campaign, and a cross-tenant read looks the same.
        let err = campaign_metrics(
            State(state.clone()),
            Path("ghost".to_string()),
            Query(default_params()),
            tenant_headers("t1"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = campaign_metrics(
            State(state.clone()),
            Path("c1".to_string()),
            Query(default_params()),
            tenant_headers("someone-else"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        // Out-of-range window.
        let err = campaign_metrics(
            State(state),
            Path("c1".to_string()),
            Query(MetricsParams {
                window_minutes: 2000,
                include_timeseries: false,
            }),
            tenant_headers("t1"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_tenant_header_required() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            tenant_id_from_headers(&headers),
            Err(ApiError::MissingTenant)
        ));

        headers.insert("x-tenant-id", HeaderValue::from_static("  "));
        assert!(matches!(
            tenant_id_from_headers(&headers),
            Err(ApiError::MissingTenant)
        ));

        headers.insert("x-tenant-id", HeaderValue::from_static("tenant-1"));
        assert_eq!(tenant_id_from_headers(&headers).unwrap(), "tenant-1");
    }

    #[test]
    fn test_params_defaults() {
        let params: MetricsParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.window_minutes, 60);
        assert!(!params.include_timeseries);

        let params: MetricsParams =
            serde_json::from_str(r#"{"windowMinutes": 120, "includeTimeseries": true}"#).unwrap();
        assert_eq!(params.window_minutes, 120);
        assert!(params.include_timeseries);
    }
}
