//! SQLite persistence layer for Cadence.
//!
//! This crate owns the durable campaign event log and its read models:
//! tenants, campaigns (with their derived counter projection), the
//! append-only `campaign_events` table, and ingestion-feed checkpoints.
//! All operations are async via SQLx.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use event_store::{event, EventStore};
//! use event_store::models::{Channel, EventType, NewCampaignEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let store = EventStore::connect("sqlite:cadence.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     // Append a delivery-lifecycle fact
//!     let event = NewCampaignEvent::new(
//!         "tenant-1", "campaign-1", "contact-1",
//!         Channel::Email, EventType::Sent, Utc::now(),
//!     )
//!     .with_cost(0.004, "USD");
//!     event::append_event(store.pool(), &event).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod campaign;
pub mod checkpoint;
pub mod error;
pub mod event;
pub mod models;
pub mod tenant;

pub use error::{Result, StoreError};
pub use models::{
    AbGroup, Campaign, CampaignEvent, CampaignStatus, Channel, EventType, NewCampaignEvent, Tenant,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Store connection wrapper.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Default pool size for store connections.
    /// Sized for one aggregator writer plus concurrent query-engine readers.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist, or
    /// `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to event store: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running event store migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
