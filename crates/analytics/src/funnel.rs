//! Funnel counting and rate derivation.
//!
//! The funnel is the ordered progression Sent -> Delivered -> Opened ->
//! Clicked, with Failed/Unsubscribed/Bounced/SpamReport as branch outcomes.
//! `Sent` is the denominator root: out-of-order arrival is not rejected,
//! it just lands in the same counters.

use event_store::models::{CampaignEvent, Channel, EventType};
use serde::Serialize;

/// Per-event-type counts over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelCounts {
    pub sent: u64,
    pub delivered: u64,
    pub opened: u64,
    pub clicked: u64,
    pub failed: u64,
    pub unsubscribed: u64,
    pub bounced: u64,
    pub spam_reports: u64,
}

impl FunnelCounts {
    /// Record one event.
    pub fn add(&mut self, event_type: EventType) {
        match event_type {
            EventType::Sent => self.sent += 1,
            EventType::Delivered => self.delivered += 1,
            EventType::Opened => self.opened += 1,
            EventType::Clicked => self.clicked += 1,
            EventType::Failed => self.failed += 1,
            EventType::Unsubscribed => self.unsubscribed += 1,
            EventType::Bounced => self.bounced += 1,
            EventType::SpamReport => self.spam_reports += 1,
        }
    }

    /// Total events across all types.
    pub fn total(&self) -> u64 {
        self.sent
            + self.delivered
            + self.opened
            + self.clicked
            + self.failed
            + self.unsubscribed
            + self.bounced
            + self.spam_reports
    }
}

/// Count funnel stages over a window of events.
pub fn count_funnel(events: &[CampaignEvent]) -> FunnelCounts {
    let mut counts = FunnelCounts::default();
    for event in events {
        counts.add(event.event_type);
    }
    counts
}

/// Derived funnel rates. Every rate is zero-guarded: a zero denominator
/// yields 0.0, never NaN or an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelRates {
    /// delivered / sent
    pub delivery_rate: f64,
    /// opened / delivered; always 0.0 for the `web` channel, which has no
    /// open tracking (a tracked rate of zero, not null).
    pub open_rate: f64,
    /// clicked / opened
    pub click_rate: f64,
}

/// Compute rates from counts, applying per-channel semantics.
pub fn compute_rates(counts: &FunnelCounts, channel: Option<Channel>) -> FunnelRates {
    let open_rate = match channel {
        Some(Channel::Web) => 0.0,
        _ => ratio(counts.opened, counts.delivered),
    };

    FunnelRates {
        delivery_rate: ratio(counts.delivered, counts.sent),
        open_rate,
        click_rate: ratio(counts.clicked, counts.opened),
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
