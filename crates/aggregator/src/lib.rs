//! Fault-isolated campaign event aggregation for Cadence.
//!
//! The aggregator is a single long-lived background task that drains the
//! ingestion feed in batches, maintains rolling in-memory statistics, and
//! publishes an immutable metrics snapshot after every iteration. A bad
//! event or an unreachable feed must never terminate the host process:
//! per-event failures are counted and skipped, feed failures are retried
//! with bounded exponential backoff.
//!
//! # Example
//!
//! ```no_run
//! use aggregator::{Aggregator, AggregatorConfig};
//! use event_store::EventStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EventStore::connect("sqlite:cadence.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     let (aggregator, handle) =
//!         Aggregator::from_store(store, AggregatorConfig::default());
//!
//!     // The handle is what the health endpoint reads; pass it explicitly,
//!     // there is no global instance.
//!     tokio::spawn(aggregator.run_with_shutdown(async {
//!         tokio::signal::ctrl_c().await.expect("ctrl-c handler");
//!     }));
//!
//!     let _ = handle.current();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod feed;
pub mod metrics;
pub mod slo;

pub use config::AggregatorConfig;
pub use feed::{EventFeed, FeedError, StoreFeed};
pub use metrics::{AggregatorMetrics, LoopState, ProcessedEvent};
pub use slo::{HealthStatus, SloReport, SloTargets};

use std::collections::HashMap;
use std::future::Future;

use chrono::Utc;
use event_store::models::EventType;
use event_store::{campaign, CampaignEvent, EventStore};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::metrics::{success_rate_percent, RateWindow, RecentIds, Ring};

/// Read handle for the latest published metrics snapshot.
///
/// Cheap to clone; reads never contend with the aggregator loop. Yields
/// `None` until the loop has published its first snapshot.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    rx: watch::Receiver<Option<AggregatorMetrics>>,
}

impl MetricsHandle {
    /// The most recent snapshot, if any has been published.
    pub fn current(&self) -> Option<AggregatorMetrics> {
        self.rx.borrow().clone()
    }

    /// A handle with no aggregator behind it. Useful in tests and for
    /// wiring surfaces before a loop exists; `current()` is always `None`.
    pub fn disconnected() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }
}

/// Per-campaign counter deltas accumulated over one batch.
#[derive(Debug, Default)]
struct CounterDeltas {
    sent: i64,
    success: i64,
    failed: i64,
}

impl CounterDeltas {
    fn merge(&mut self, other: &CounterDeltas) {
        self.sent += other.sent;
        self.success += other.success;
        self.failed += other.failed;
    }
}

/// The aggregation loop. Owns all mutable counter state; readers only see
/// snapshots published through the [`MetricsHandle`].
pub struct Aggregator<F: EventFeed> {
    feed: F,
    store: EventStore,
    config: AggregatorConfig,
    state: LoopState,
    started_at: chrono::DateTime<Utc>,
    events_processed: u64,
    events_failed: u64,
    batches_processed: u64,
    last_processed_time: Option<chrono::DateTime<Utc>>,
    rate: RateWindow,
    ring: Ring<ProcessedEvent>,
    recent_ids: RecentIds,
    /// Counter deltas not yet applied to the campaign projection. Deltas
    /// that fail to apply stay here and are retried on the next flush.
    pending_deltas: HashMap<String, CounterDeltas>,
    tx: watch::Sender<Option<AggregatorMetrics>>,
}

impl Aggregator<StoreFeed> {
    /// Build an aggregator backed by the durable store's own feed.
    pub fn from_store(store: EventStore, config: AggregatorConfig) -> (Self, MetricsHandle) {
        let feed = StoreFeed::new(store.clone(), config.consumer.clone(), config.batch_size);
        Self::new(feed, store, config)
    }
}

impl<F: EventFeed> Aggregator<F> {
    /// Build an aggregator over an arbitrary feed.
    pub fn new(feed: F, store: EventStore, config: AggregatorConfig) -> (Self, MetricsHandle) {
        let (tx, rx) = watch::channel(None);
        let aggregator = Self {
            feed,
            store,
            state: LoopState::Starting,
            started_at: Utc::now(),
            events_processed: 0,
            events_failed: 0,
            batches_processed: 0,
            last_processed_time: None,
            rate: RateWindow::new(config.rate_window),
            ring: Ring::new(config.ring_capacity),
            recent_ids: RecentIds::new(config.effective_dedup_capacity()),
            pending_deltas: HashMap::new(),
            config,
            tx,
        };
        (aggregator, MetricsHandle { rx })
    }

    /// Run the loop until the shutdown future completes.
    ///
    /// An in-flight batch is always applied in full before the loop exits;
    /// checkpoints are committed per batch, so shutdown has nothing extra
    /// to persist. Only cancellation stops the loop.
    pub async fn run_with_shutdown<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        info!(
            "Starting aggregator loop (consumer: {}, batch size: {})",
            self.config.consumer, self.config.batch_size
        );
        self.started_at = Utc::now();
        self.publish();

        tokio::pin!(shutdown);
        let mut backoff = self.config.poll_interval;

        loop {
            let batch = tokio::select! {
                biased;

                () = &mut shutdown => break,
                batch = self.feed.next_batch() => batch,
            };

            match batch {
                Ok(events) if events.is_empty() => {
                    self.state = LoopState::Running;
                    backoff = self.config.poll_interval;
                    if !self.pending_deltas.is_empty() {
                        self.flush_counter_deltas().await;
                    }
                    self.publish();

                    // Idle: wait for new events, staying responsive to shutdown.
                    tokio::select! {
                        biased;
                        () = &mut shutdown => break,
                        _ = sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(events) => {
                    self.state = LoopState::Running;
                    backoff = self.config.poll_interval;
                    self.apply_batch(events).await;
                    self.publish();
                }
                Err(e) => {
                    warn!("Ingestion feed unreachable, backing off {:?}: {}", backoff, e);
                    self.state = LoopState::Stalled;
                    self.publish();

                    tokio::select! {
                        biased;
                        () = &mut shutdown => break,
                        _ = sleep(backoff) => {}
                    }
                    backoff = backoff
                        .saturating_mul(2)
                        .min(self.config.max_backoff);
                }
            }
        }

        info!("Shutdown signal received, stopping aggregator loop");
        self.state = LoopState::Stopping;
        self.publish();
        self.state = LoopState::Stopped;
        self.publish();
    }

    /// Apply one batch: dedup, validate, count, project, commit.
    ///
    /// Failures here are counted or logged, never propagated; a poisoned
    /// batch must not stop ingestion.
    async fn apply_batch(&mut self, events: Vec<CampaignEvent>) {
        let last_id = events.last().map(|e| e.id);
        let batch_len = events.len();
        let mut fresh: u64 = 0;
        let mut failed: u64 = 0;
        let mut deltas: HashMap<String, CounterDeltas> = HashMap::new();

        for event in events {
            // Idempotency: re-delivered ids are a no-op for all counters.
            if !self.recent_ids.insert(event.id) {
                debug!("Skipping duplicate event {}", event.id);
                continue;
            }
            fresh += 1;

            match validate_event(&event) {
                Ok(()) => {
                    let delta = deltas.entry(event.campaign_id.clone()).or_default();
                    match event.event_type {
                        EventType::Sent => delta.sent += 1,
                        EventType::Delivered => delta.success += 1,
                        EventType::Failed => delta.failed += 1,
                        _ => {}
                    }

                    self.ring.push(ProcessedEvent {
                        event_id: event.id,
                        campaign_id: event.campaign_id,
                        event_type: event.event_type,
                        occurred_at: event.occurred_at,
                    });
                }
                Err(reason) => {
                    failed += 1;
                    warn!("Rejected event {}: {}", event.id, reason);
                }
            }
        }

        let now = Utc::now();
        self.events_processed += fresh;
        self.events_failed += failed;
        self.batches_processed += 1;
        self.rate.record(now, fresh);
        self.last_processed_time = Some(now);

        debug!(
            "Applied batch of {} ({} new, {} failed)",
            batch_len, fresh, failed
        );

        for (campaign_id, delta) in deltas {
            self.pending_deltas
                .entry(campaign_id)
                .or_default()
                .merge(&delta);
        }
        self.flush_counter_deltas().await;

        if let Some(last_id) = last_id {
            // A failed commit leaves the old checkpoint; redelivery after a
            // restart is handled by the dedup set.
            if let Err(e) = self.feed.commit(last_id).await {
                warn!("Failed to commit checkpoint {}: {}", last_id, e);
            }
        }
    }

    /// Flush pending counter deltas to the campaign projection.
    ///
    /// The event log stays authoritative; a delta that fails to apply is
    /// kept and retried with the next flush, so the projection converges
    /// once the store is reachable again.
    async fn flush_counter_deltas(&mut self) {
        let pending = std::mem::take(&mut self.pending_deltas);
        for (campaign_id, delta) in pending {
            if let Err(e) = campaign::apply_counter_deltas(
                self.store.pool(),
                &campaign_id,
                delta.sent,
                delta.success,
                delta.failed,
            )
            .await
            {
                warn!(
                    "Failed to project counters for campaign {}, will retry: {}",
                    campaign_id, e
                );
                self.pending_deltas.insert(campaign_id, delta);
            }
        }
    }

    /// Publish an immutable snapshot. The watch channel swaps the value
    /// atomically, so readers always see a consistent whole.
    fn publish(&mut self) {
        let now = Utc::now();
        let snapshot = AggregatorMetrics {
            state: self.state,
            events_processed: self.events_processed,
            events_failed: self.events_failed,
            batches_processed: self.batches_processed,
            last_processed_time: self.last_processed_time,
            started_at: self.started_at,
            uptime_seconds: (now - self.started_at).num_milliseconds() as f64 / 1000.0,
            events_per_second: self.rate.per_second(now),
            success_rate: success_rate_percent(self.events_processed, self.events_failed),
            processed_events_in_memory: self.ring.len(),
        };
        let _ = self.tx.send(Some(snapshot));
    }
}

/// Reject events the counters cannot meaningfully absorb.
fn validate_event(event: &CampaignEvent) -> Result<(), String> {
    if event.campaign_id.trim().is_empty() {
        return Err("empty campaign id".to_string());
    }
    if event.contact_id.trim().is_empty() {
        return Err("empty contact id".to_string());
    }
    if !event.cost_amount.is_finite() || event.cost_amount < 0.0 {
        return Err(format!("invalid cost amount: {}", event.cost_amount));
    }
    Ok(())
}
