//! SLO evaluation: a pure function of a metrics snapshot against fixed
//! targets. Holds no state, performs no side effects beyond reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::metrics::{AggregatorMetrics, LoopState};

/// Service-level objective targets for the aggregator.
#[derive(Debug, Clone)]
pub struct SloTargets {
    /// Sustained throughput floor, events per second.
    pub min_events_per_second: f64,
    /// Success rate floor, percent.
    pub min_success_rate: f64,
    /// End-to-end dashboard lag ceiling.
    pub max_staleness: Duration,
}

impl Default for SloTargets {
    fn default() -> Self {
        Self {
            min_events_per_second: 50.0,
            min_success_rate: 99.0,
            max_staleness: Duration::from_secs(5),
        }
    }
}

/// Overall health verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// SLO evaluation result: the verdict plus the raw numbers behind it,
/// for observability tooling.
#[derive(Debug, Clone, Serialize)]
pub struct SloReport {
    pub status: HealthStatus,
    pub events_per_second: f64,
    pub success_rate_percent: f64,
    pub staleness_seconds: f64,
    pub throughput_met: bool,
    pub success_rate_met: bool,
    pub staleness_met: bool,
}

impl SloReport {
    /// Evaluate a snapshot against targets at time `now`.
    ///
    /// One breached target reads as degraded; two or more, or a loop that
    /// is stalled or stopped, as unhealthy.
    pub fn evaluate(
        metrics: &AggregatorMetrics,
        targets: &SloTargets,
        now: DateTime<Utc>,
    ) -> Self {
        let staleness_seconds = metrics.staleness_seconds(now);

        let throughput_met = metrics.events_per_second >= targets.min_events_per_second;
        let success_rate_met = metrics.success_rate >= targets.min_success_rate;
        let staleness_met = staleness_seconds <= targets.max_staleness.as_secs_f64();

        let breaches = [throughput_met, success_rate_met, staleness_met]
            .iter()
            .filter(|met| !**met)
            .count();

        let loop_down = matches!(metrics.state, LoopState::Stalled | LoopState::Stopped);

        let status = if loop_down || breaches >= 2 {
            HealthStatus::Unhealthy
        } else if breaches == 1 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            events_per_second: metrics.events_per_second,
            success_rate_percent: metrics.success_rate,
            staleness_seconds,
            throughput_met,
            success_rate_met,
            staleness_met,
        }
    }
}
