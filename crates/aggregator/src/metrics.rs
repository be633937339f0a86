//! Aggregator self-metrics: the published snapshot and its supporting
//! bounded structures (sliding rate window, introspection ring, dedup set).

use chrono::{DateTime, Utc};
use event_store::models::EventType;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

/// Aggregator loop state.
///
/// `Stalled` is not terminal: the loop keeps retrying the feed with backoff
/// until cancellation, which is the only path to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Starting,
    Running,
    Stalled,
    Stopping,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Starting => "starting",
            LoopState::Running => "running",
            LoopState::Stalled => "stalled",
            LoopState::Stopping => "stopping",
            LoopState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Summary of one processed event, retained in the introspection ring.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedEvent {
    pub event_id: i64,
    pub campaign_id: String,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
}

/// Immutable snapshot of aggregator state, published after each loop
/// iteration. Readers never touch the loop's mutable state.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatorMetrics {
    pub state: LoopState,
    /// Total events drained from the feed (including failed ones,
    /// excluding duplicates).
    pub events_processed: u64,
    /// Events rejected during processing.
    pub events_failed: u64,
    pub batches_processed: u64,
    /// When the last batch finished applying. `None` until the first batch.
    pub last_processed_time: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    /// Seconds since the loop started, as of snapshot publication.
    pub uptime_seconds: f64,
    /// Sliding-window rate over the configured trailing window, not a
    /// lifetime average.
    pub events_per_second: f64,
    /// Percentage; 100.0 when nothing has been processed yet.
    pub success_rate: f64,
    /// Occupancy of the introspection ring buffer.
    pub processed_events_in_memory: usize,
}

impl AggregatorMetrics {
    /// Seconds since the last batch was applied. Falls back to loop start
    /// for an aggregator that has never processed a batch.
    pub fn staleness_seconds(&self, now: DateTime<Utc>) -> f64 {
        let reference = self.last_processed_time.unwrap_or(self.started_at);
        (now - reference).num_milliseconds() as f64 / 1000.0
    }
}

/// Success rate as a percentage, guarded against divide-by-zero.
pub(crate) fn success_rate_percent(processed: u64, failed: u64) -> f64 {
    if processed == 0 {
        return 100.0;
    }
    processed.saturating_sub(failed) as f64 / processed as f64 * 100.0
}

/// Sliding-window event rate: per-second buckets over a trailing window.
/// Old buckets age out; nothing ever resets.
#[derive(Debug)]
pub(crate) struct RateWindow {
    window_secs: i64,
    /// (unix second, events recorded in that second), oldest first.
    buckets: VecDeque<(i64, u64)>,
}

impl RateWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window_secs: (window.as_secs() as i64).max(1),
            buckets: VecDeque::new(),
        }
    }

    pub fn record(&mut self, now: DateTime<Utc>, count: u64) {
        if count == 0 {
            return;
        }
        let second = now.timestamp();
        match self.buckets.back_mut() {
            Some((ts, total)) if *ts == second => *total += count,
            _ => self.buckets.push_back((second, count)),
        }
        self.evict(second);
    }

    /// Events in the trailing window divided by window seconds.
    pub fn per_second(&mut self, now: DateTime<Utc>) -> f64 {
        self.evict(now.timestamp());
        let total: u64 = self.buckets.iter().map(|(_, count)| count).sum();
        total as f64 / self.window_secs as f64
    }

    fn evict(&mut self, now_secs: i64) {
        let cutoff = now_secs - self.window_secs;
        while matches!(self.buckets.front(), Some((ts, _)) if *ts <= cutoff) {
            self.buckets.pop_front();
        }
    }
}

/// Fixed-capacity ring that drops its oldest entry on overflow.
#[derive(Debug)]
pub(crate) struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Bounded set of recently seen event ids, evicting in insertion order.
#[derive(Debug)]
pub(crate) struct RecentIds {
    seen: HashSet<i64>,
    order: VecDeque<i64>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns false if the id was already present (a duplicate delivery).
    pub fn insert(&mut self, id: i64) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        self.order.push_back(id);
        true
    }
}
