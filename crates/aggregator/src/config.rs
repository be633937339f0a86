//! Configuration for the aggregator loop.

use std::time::Duration;

/// Default checkpoint consumer name.
const DEFAULT_CONSUMER: &str = "aggregator";

/// Default maximum events per feed fetch.
const DEFAULT_BATCH_SIZE: i64 = 500;

/// Default idle poll interval between fetches.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default ceiling for feed-failure backoff.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default sliding window for the events-per-second rate.
const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Default introspection ring buffer capacity.
const DEFAULT_RING_CAPACITY: usize = 1000;

/// Configuration for the aggregator loop.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Checkpoint consumer name. Instances sharing a name share a resume
    /// point; partitioned deployments must use distinct names.
    pub consumer: String,

    /// Max events per feed fetch.
    pub batch_size: i64,

    /// Sleep between fetches when the feed is idle.
    pub poll_interval: Duration,

    /// Ceiling for the exponential backoff applied when the feed is
    /// unreachable. Backoff starts at `poll_interval` and doubles.
    pub max_backoff: Duration,

    /// Trailing window over which `events_per_second` is computed.
    pub rate_window: Duration,

    /// Capacity of the recent-events ring buffer kept for introspection.
    /// Under memory pressure only this buffer drops entries, never counters.
    pub ring_capacity: usize,

    /// Capacity of the recently-seen id set used for idempotent re-ingestion.
    /// 0 means derive it as 10x `batch_size`.
    pub dedup_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            consumer: DEFAULT_CONSUMER.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
            rate_window: DEFAULT_RATE_WINDOW,
            ring_capacity: DEFAULT_RING_CAPACITY,
            dedup_capacity: 0,
        }
    }
}

impl AggregatorConfig {
    /// Create a config with a custom consumer name.
    pub fn with_consumer(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            ..Default::default()
        }
    }

    /// Effective dedup set capacity.
    pub fn effective_dedup_capacity(&self) -> usize {
        if self.dedup_capacity > 0 {
            self.dedup_capacity
        } else {
            (self.batch_size as usize).saturating_mul(10).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.consumer, "aggregator");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.effective_dedup_capacity(), 5000);
    }

    #[test]
    fn test_with_consumer() {
        let config = AggregatorConfig::with_consumer("shard-eu-1");
        assert_eq!(config.consumer, "shard-eu-1");
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn test_explicit_dedup_capacity_wins() {
        let config = AggregatorConfig {
            dedup_capacity: 128,
            ..Default::default()
        };
        assert_eq!(config.effective_dedup_capacity(), 128);
    }
}
