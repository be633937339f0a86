//! The ingestion feed boundary.
//!
//! A feed surfaces newly durable events to the aggregator in id order and
//! owns the resume checkpoint. Delivery is at-least-once: a crash between
//! apply and commit re-delivers the tail, which the loop deduplicates by
//! event id.

use async_trait::async_trait;
use event_store::{checkpoint, event, CampaignEvent, EventStore, StoreError};
use thiserror::Error;

/// Errors surfaced by an ingestion feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The backing store failed (unreachable, timeout, query error).
    #[error("feed store error: {0}")]
    Store(#[from] StoreError),

    /// The feed transport is unavailable.
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Source of ordered campaign event batches.
///
/// The trait seam exists so tests can inject scripted or failing feeds;
/// production uses [`StoreFeed`].
#[async_trait]
pub trait EventFeed: Send {
    /// Fetch the next batch of events, ordered by id. An empty batch means
    /// the feed is idle. Errors are transient; the caller retries with
    /// backoff and must never treat them as fatal.
    async fn next_batch(&mut self) -> Result<Vec<CampaignEvent>, FeedError>;

    /// Durably record that every event up to and including `last_event_id`
    /// has been applied.
    async fn commit(&mut self, last_event_id: i64) -> Result<(), FeedError>;
}

/// Feed that polls the durable event store from a named checkpoint.
pub struct StoreFeed {
    store: EventStore,
    consumer: String,
    batch_size: i64,
    /// In-memory read cursor; `None` until the checkpoint is first loaded.
    cursor: Option<i64>,
}

impl StoreFeed {
    pub fn new(store: EventStore, consumer: impl Into<String>, batch_size: i64) -> Self {
        Self {
            store,
            consumer: consumer.into(),
            batch_size,
            cursor: None,
        }
    }
}

#[async_trait]
impl EventFeed for StoreFeed {
    async fn next_batch(&mut self) -> Result<Vec<CampaignEvent>, FeedError> {
        let cursor = match self.cursor {
            Some(cursor) => cursor,
            None => {
                let cursor = checkpoint::load(self.store.pool(), &self.consumer).await?;
                tracing::info!("Feed '{}' resuming after event {}", self.consumer, cursor);
                self.cursor = Some(cursor);
                cursor
            }
        };

        let events = event::fetch_after(self.store.pool(), cursor, self.batch_size).await?;

        // Advance the read cursor eagerly; durability comes from commit().
        // A restart falls back to the last committed checkpoint.
        if let Some(last) = events.last() {
            self.cursor = Some(last.id);
        }

        Ok(events)
    }

    async fn commit(&mut self, last_event_id: i64) -> Result<(), FeedError> {
        checkpoint::store(self.store.pool(), &self.consumer, last_event_id).await?;
        Ok(())
    }
}
