//! The `getCampaignMetrics` operation: validate, resolve tenant-scoped
//! campaign, scan the window, derive funnel metrics.

use chrono::{DateTime, Duration, Utc};
use event_store::{campaign, event, EventStore, StoreError};
use serde::Serialize;
use tracing::debug;

use crate::error::{AnalyticsError, Result};
use crate::funnel::{compute_rates, count_funnel, FunnelCounts, FunnelRates};
use crate::timeseries::{bucket_events, bucket_width, TimeBucket};

/// Smallest accepted query window.
pub const MIN_WINDOW_MINUTES: i64 = 1;

/// Largest accepted query window (24h). Longer ranges are a batch/external
/// reporting concern, not served live.
pub const MAX_WINDOW_MINUTES: i64 = 1440;

/// Parameters for one metrics query.
#[derive(Debug, Clone)]
pub struct MetricsQuery {
    pub window_minutes: i64,
    pub include_timeseries: bool,
    /// End of the window. Injected rather than read from the wall clock so
    /// callers and tests control "now".
    pub now: DateTime<Utc>,
}

impl MetricsQuery {
    pub fn new(window_minutes: i64, include_timeseries: bool) -> Self {
        Self {
            window_minutes,
            include_timeseries,
            now: Utc::now(),
        }
    }

    /// Pin the window end to a specific instant.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Funnel metrics for one campaign over one bounded window.
///
/// Freshness matters more than cache efficiency here: the HTTP layer must
/// serve this with caching disabled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub window_minutes: i64,
    pub generated_at: DateTime<Utc>,
    pub funnel: FunnelCounts,
    #[serde(flatten)]
    pub rates: FunnelRates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeseries: Option<Vec<TimeBucket>>,
}

/// Compute funnel metrics for a tenant's campaign.
///
/// Validation runs before any store access; an out-of-range window never
/// triggers a scan. A campaign belonging to another tenant yields the same
/// `NotFound` as a nonexistent one. A campaign with zero events in the
/// window yields all-zero metrics, not an error.
pub async fn get_campaign_metrics(
    store: &EventStore,
    campaign_id: &str,
    tenant_id: &str,
    query: &MetricsQuery,
) -> Result<CampaignMetrics> {
    if !(MIN_WINDOW_MINUTES..=MAX_WINDOW_MINUTES).contains(&query.window_minutes) {
        return Err(AnalyticsError::InvalidWindow(query.window_minutes));
    }

    let campaign = campaign::get_campaign(store.pool(), campaign_id, tenant_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound { .. } => AnalyticsError::NotFound(campaign_id.to_string()),
            other => AnalyticsError::Store(other),
        })?;

    let from = query.now - Duration::minutes(query.window_minutes);
    let events =
        event::events_in_window(store.pool(), tenant_id, campaign_id, from, query.now).await?;

    debug!(
        "Computing metrics for campaign {} over {} events ({}m window)",
        campaign_id,
        events.len(),
        query.window_minutes
    );

    let funnel = count_funnel(&events);
    let rates = compute_rates(&funnel, campaign.primary_channel());
    let timeseries = query.include_timeseries.then(|| {
        bucket_events(&events, from, query.now, bucket_width(query.window_minutes))
    });

    Ok(CampaignMetrics {
        campaign_id: campaign_id.to_string(),
        window_minutes: query.window_minutes,
        generated_at: query.now,
        funnel,
        rates,
        timeseries,
    })
}
