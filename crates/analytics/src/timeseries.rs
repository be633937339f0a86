//! Fixed-width time bucketing for the optional metrics time series.

use chrono::{DateTime, Duration, Utc};
use event_store::models::CampaignEvent;
use serde::Serialize;

use crate::funnel::FunnelCounts;

/// Per-bucket funnel counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub bucket_start: DateTime<Utc>,
    pub counts: FunnelCounts,
}

/// Bucket width scales with the window so the series stays a bounded size:
/// 1-minute buckets up to two hours, 5 minutes up to twelve, 15 beyond.
pub fn bucket_width(window_minutes: i64) -> Duration {
    if window_minutes <= 120 {
        Duration::minutes(1)
    } else if window_minutes <= 720 {
        Duration::minutes(5)
    } else {
        Duration::minutes(15)
    }
}

/// Bucket events into fixed-size buckets covering `[from, to]`.
///
/// Every bucket in the range is emitted, zero counts included, so charts
/// get a stable x-axis. Events outside the range are ignored; an event
/// exactly on `to` lands in the final bucket.
pub fn bucket_events(
    events: &[CampaignEvent],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    width: Duration,
) -> Vec<TimeBucket> {
    let width_secs = width.num_seconds().max(1);

    let mut buckets = Vec::new();
    let mut start = from;
    while start < to {
        buckets.push(TimeBucket {
            bucket_start: start,
            counts: FunnelCounts::default(),
        });
        start += width;
    }
    if buckets.is_empty() {
        return buckets;
    }

    let last = buckets.len() - 1;
    for event in events {
        if event.occurred_at < from || event.occurred_at > to {
            continue;
        }
        let offset = (event.occurred_at - from).num_seconds();
        let index = ((offset / width_secs) as usize).min(last);
        buckets[index].counts.add(event.event_type);
    }

    buckets
}
