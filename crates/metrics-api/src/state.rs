//! Application state shared across handlers.

use aggregator::{MetricsHandle, SloTargets};
use event_store::EventStore;

/// Shared application state.
///
/// The aggregator is discovered through the handle placed here by the
/// composition root; there is no process-global instance.
#[derive(Clone)]
pub struct AppState {
    /// Durable event store.
    pub store: EventStore,
    /// Read handle for aggregator metrics snapshots.
    pub metrics: MetricsHandle,
    /// SLO targets the health surface evaluates against.
    pub slo_targets: SloTargets,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: EventStore, metrics: MetricsHandle, slo_targets: SloTargets) -> Self {
        Self {
            store,
            metrics,
            slo_targets,
        }
    }
}
