//! Metrics API for Cadence.
//!
//! Composition root: connects the event store, constructs the aggregator
//! explicitly and spawns its loop, then serves the health and campaign
//! metrics endpoints with the aggregator handle passed through state.

mod config;
mod error;
mod routes;
mod state;

use aggregator::{Aggregator, AggregatorConfig, SloTargets};
use event_store::EventStore;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration; missing/invalid config must fail startup.
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting metrics API server");

    // Connect to the event store
    let store = EventStore::connect(&config.database_url).await?;
    store.migrate().await?;

    // Construct the aggregator explicitly and keep only its read handle.
    let aggregator_config = AggregatorConfig {
        batch_size: config.batch_size,
        poll_interval: config.poll_interval,
        ..Default::default()
    };
    let (aggregator, metrics) = Aggregator::from_store(store.clone(), aggregator_config);

    tokio::spawn(aggregator.run_with_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
    }));

    // Build application state
    let state = AppState::new(store, metrics, SloTargets::default());

    // Build router
    let app = routes::router().with_state(state);

    // Start server
    info!(addr = %config.addr, "Metrics API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
