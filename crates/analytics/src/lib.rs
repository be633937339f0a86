//! Funnel and time-series query engine for Cadence.
//!
//! Stateless computation over a bounded recent window of campaign events:
//! validate the request, resolve the campaign within its tenant, scan the
//! durable log, and derive funnel counts, zero-guarded rates, and an
//! optional bucketed time series. Long-range reporting is an external
//! batch concern; only windows up to 24 hours are served live.

pub mod error;
pub mod funnel;
pub mod query;
pub mod timeseries;

pub use error::{AnalyticsError, Result};
pub use funnel::{compute_rates, count_funnel, FunnelCounts, FunnelRates};
pub use query::{
    get_campaign_metrics, CampaignMetrics, MetricsQuery, MAX_WINDOW_MINUTES, MIN_WINDOW_MINUTES,
};
pub use timeseries::{bucket_events, bucket_width, TimeBucket};
