//! Integration tests for the aggregator loop.
//!
//! These drive the real loop against an in-memory store (or a scripted
//! feed) and observe it only through the published metrics handle, the way
//! the health surface does.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aggregator::{
    Aggregator, AggregatorConfig, EventFeed, FeedError, LoopState, MetricsHandle, SloReport,
    SloTargets,
};
use async_trait::async_trait;
use chrono::Utc;
use event_store::models::{Channel, EventType, NewCampaignEvent};
use event_store::{checkpoint, event, CampaignEvent, EventStore};

async fn test_store() -> EventStore {
    let store = EventStore::connect("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    store
}

fn fast_config() -> AggregatorConfig {
    AggregatorConfig {
        poll_interval: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        ..Default::default()
    }
}

async fn seed_sent_events(store: &EventStore, n: usize) -> Vec<i64> {
    let now = Utc::now();
    let batch: Vec<_> = (0..n)
        .map(|i| {
            NewCampaignEvent::new(
                "t1",
                "c1",
                format!("contact-{i}"),
                Channel::Email,
                EventType::Sent,
                now,
            )
        })
        .collect();
    event::append_events(store.pool(), &batch).await.unwrap()
}

/// Poll the handle until the predicate holds or five seconds pass.
async fn wait_for<P>(handle: &MetricsHandle, predicate: P) -> aggregator::AggregatorMetrics
where
    P: Fn(&aggregator::AggregatorMetrics) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(metrics) = handle.current() {
            if predicate(&metrics) {
                return metrics;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for metrics condition");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Feed that replays a fixed script, then reports idle forever.
struct ScriptedFeed {
    batches: VecDeque<Result<Vec<CampaignEvent>, FeedError>>,
    committed: Arc<Mutex<Vec<i64>>>,
}

impl ScriptedFeed {
    fn new(
        batches: Vec<Result<Vec<CampaignEvent>, FeedError>>,
    ) -> (Self, Arc<Mutex<Vec<i64>>>) {
        let committed = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                batches: batches.into(),
                committed: committed.clone(),
            },
            committed,
        )
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn next_batch(&mut self) -> Result<Vec<CampaignEvent>, FeedError> {
        self.batches.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn commit(&mut self, last_event_id: i64) -> Result<(), FeedError> {
        self.committed.lock().unwrap().push(last_event_id);
        Ok(())
    }
}

fn fact(id: i64, event_type: EventType) -> CampaignEvent {
    let now = Utc::now();
    CampaignEvent {
        id,
        tenant_id: "t1".to_string(),
        campaign_id: "c1".to_string(),
        contact_id: format!("contact-{id}"),
        channel: Channel::Email,
        event_type,
        occurred_at: now,
        created_at: now,
        provider_message_id: None,
        failure_reason: None,
        failure_code: None,
        ab_group: None,
        cost_amount: 0.0,
        currency: "USD".to_string(),
        user_agent_hash: None,
    }
}

#[tokio::test]
async fn test_loop_drains_store_and_checkpoints() {
    let store = test_store().await;
    let ids = seed_sent_events(&store, 120).await;

    let (aggregator, handle) = Aggregator::from_store(store.clone(), fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(aggregator.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let metrics = wait_for(&handle, |m| m.events_processed == 120).await;
    assert_eq!(metrics.events_failed, 0);
    assert_eq!(metrics.success_rate, 100.0);
    assert!(metrics.events_per_second > 0.0);
    assert_eq!(metrics.state, LoopState::Running);

    stop_tx.send(()).unwrap();
    task.await.unwrap();

    let final_metrics = handle.current().unwrap();
    assert_eq!(final_metrics.state, LoopState::Stopped);
    assert_eq!(
        checkpoint::load(store.pool(), "aggregator").await.unwrap(),
        *ids.last().unwrap()
    );
}

#[tokio::test]
async fn test_redelivered_batch_does_not_double_count() {
    let store = test_store().await;
    let batch: Vec<_> = (1..=20).map(|i| fact(i, EventType::Sent)).collect();
    let (feed, _committed) = ScriptedFeed::new(vec![Ok(batch.clone()), Ok(batch)]);

    let (aggregator, handle) = Aggregator::new(feed, store, fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(aggregator.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let metrics = wait_for(&handle, |m| m.batches_processed >= 2).await;
    assert_eq!(metrics.events_processed, 20);
    assert_eq!(metrics.events_failed, 0);
    assert_eq!(metrics.success_rate, 100.0);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_feed_failure_stalls_then_self_heals() {
    let store = test_store().await;
    let (feed, committed) = ScriptedFeed::new(vec![
        Err(FeedError::Unavailable("connection refused".to_string())),
        Err(FeedError::Unavailable("connection refused".to_string())),
        Ok((1..=3).map(|i| fact(i, EventType::Sent)).collect()),
    ]);

    let (aggregator, handle) = Aggregator::new(feed, store, fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(aggregator.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    // The loop survives the outage and applies the batch once the feed heals.
    let metrics = wait_for(&handle, |m| m.events_processed == 3).await;
    assert_eq!(metrics.state, LoopState::Running);

    stop_tx.send(()).unwrap();
    task.await.unwrap();

    assert_eq!(*committed.lock().unwrap(), vec![3]);
}

#[tokio::test]
async fn test_restart_resumes_without_reprocessing() {
    let store = test_store().await;
    seed_sent_events(&store, 10).await;

    let (first, first_handle) = Aggregator::from_store(store.clone(), fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(first.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    wait_for(&first_handle, |m| m.events_processed == 10).await;
    stop_tx.send(()).unwrap();
    task.await.unwrap();

    seed_sent_events(&store, 5).await;

    // A fresh instance picks up after the committed checkpoint: it sees
    // only the five new events, never the ten already applied.
    let (second, second_handle) = Aggregator::from_store(store.clone(), fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(second.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    let metrics = wait_for(&second_handle, |m| m.events_processed > 0).await;
    stop_tx.send(()).unwrap();
    task.await.unwrap();

    assert_eq!(metrics.events_processed, 5);
}

#[tokio::test]
async fn test_staleness_observable_when_ingestion_stalls() {
    let store = test_store().await;
    seed_sent_events(&store, 5).await;

    let (aggregator, handle) = Aggregator::from_store(store.clone(), fast_config());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(aggregator.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let busy = wait_for(&handle, |m| m.events_processed == 5).await;
    let processed_at = busy.last_processed_time.unwrap();

    // No new events: uptime keeps climbing, the processed counters and the
    // last-processed timestamp stay fixed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let idle = handle.current().unwrap();
    assert_eq!(idle.events_processed, 5);
    assert_eq!(idle.last_processed_time.unwrap(), processed_at);
    assert!(idle.uptime_seconds > busy.uptime_seconds);

    // Staleness is a pure function of the snapshot: six seconds after the
    // last batch it crosses the 5s SLO threshold.
    let targets = SloTargets::default();
    let report = SloReport::evaluate(&idle, &targets, processed_at + chrono::Duration::seconds(6));
    assert!(!report.staleness_met);
    assert!(report.staleness_seconds > 5.0);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}
