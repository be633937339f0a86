//! Database models for the campaign event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Delivery medium for a campaign message.
///
/// Each channel has distinct funnel semantics: `web` never produces
/// `Opened`/`Clicked`, and `sms` open events are synthetic
/// (carrier-delivery-implies-read).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Kakao,
    Email,
    Push,
    Web,
    Social,
}

impl Channel {
    /// Whether this channel can report opens/clicks at all.
    pub fn tracks_engagement(&self) -> bool {
        !matches!(self, Channel::Web)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Kakao => "kakao",
            Channel::Email => "email",
            Channel::Push => "push",
            Channel::Web => "web",
            Channel::Social => "social",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Channel::Sms),
            "kakao" => Ok(Channel::Kakao),
            "email" => Ok(Channel::Email),
            "push" => Ok(Channel::Push),
            "web" => Ok(Channel::Web),
            "social" => Ok(Channel::Social),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// One lifecycle transition in the delivery funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EventType {
    Sent,
    Delivered,
    Opened,
    Clicked,
    Failed,
    Unsubscribed,
    Bounced,
    SpamReport,
}

/// A/B test group assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum AbGroup {
    A,
    B,
    C,
}

/// Campaign lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Queued,
    Processing,
    Sending,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    /// Whether `self -> next` is a legal lifecycle transition.
    ///
    /// Lifecycle: Draft -> Queued -> Processing -> Sending ->
    /// {Completed | Failed | Cancelled}, with Paused reachable from Sending.
    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Queued)
                | (Queued, Processing)
                | (Queued, Cancelled)
                | (Processing, Sending)
                | (Processing, Failed)
                | (Sending, Paused)
                | (Sending, Completed)
                | (Sending, Failed)
                | (Sending, Cancelled)
                | (Paused, Sending)
                | (Paused, Cancelled)
        )
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Queued => "queued",
            CampaignStatus::Processing => "processing",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// An isolation root. Every entity below carries a tenant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Tenants are deactivated, never deleted.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Create an active tenant with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// A scheduled/sent messaging effort belonging to one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Campaign {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub status: CampaignStatus,
    /// Comma-separated channel list, e.g. "email" or "sms,kakao".
    pub channels: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Derived from the event stream by the aggregator; the event log is
    /// authoritative, these are a read-model projection.
    pub sent_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Create a draft campaign with a fresh id.
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        channels: &[Channel],
    ) -> Self {
        let channels = channels
            .iter()
            .map(Channel::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            status: CampaignStatus::Draft,
            channels,
            scheduled_at: None,
            started_at: None,
            finished_at: None,
            sent_count: 0,
            success_count: 0,
            failed_count: 0,
            created_at: Utc::now(),
        }
    }

    /// The campaign's first configured channel.
    ///
    /// Campaigns are single-channel in practice; the column stores a list
    /// for forward compatibility.
    pub fn primary_channel(&self) -> Option<Channel> {
        self.channels
            .split(',')
            .next()
            .and_then(|s| s.trim().parse().ok())
    }
}

/// The central fact: one immutable delivery-lifecycle event for one
/// recipient/send-attempt. Never mutated or deleted once durable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CampaignEvent {
    /// Monotonic sequence assigned by the store; the idempotency/dedup key.
    pub id: i64,
    pub tenant_id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub channel: Channel,
    pub event_type: EventType,
    /// Provider/business time.
    pub occurred_at: DateTime<Utc>,
    /// Ingest time, used for lag computation.
    pub created_at: DateTime<Utc>,
    pub provider_message_id: Option<String>,
    pub failure_reason: Option<String>,
    pub failure_code: Option<String>,
    pub ab_group: Option<AbGroup>,
    pub cost_amount: f64,
    pub currency: String,
    pub user_agent_hash: Option<String>,
}

/// A not-yet-durable campaign event, as produced by the sending pipeline
/// or a provider callback. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCampaignEvent {
    pub tenant_id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub channel: Channel,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub provider_message_id: Option<String>,
    pub failure_reason: Option<String>,
    pub failure_code: Option<String>,
    pub ab_group: Option<AbGroup>,
    pub cost_amount: f64,
    pub currency: String,
    pub user_agent_hash: Option<String>,
}

impl NewCampaignEvent {
    /// Minimal event with zero cost, for the common confirmation types.
    pub fn new(
        tenant_id: impl Into<String>,
        campaign_id: impl Into<String>,
        contact_id: impl Into<String>,
        channel: Channel,
        event_type: EventType,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            campaign_id: campaign_id.into(),
            contact_id: contact_id.into(),
            channel,
            event_type,
            occurred_at,
            provider_message_id: None,
            failure_reason: None,
            failure_code: None,
            ab_group: None,
            cost_amount: 0.0,
            currency: "USD".to_string(),
            user_agent_hash: None,
        }
    }

    /// Set the per-channel cost carried by this event.
    ///
    /// Convention: `Sent` carries the full unit cost, `Failed` a partial
    /// cost (the provider still charges for the attempt), confirmations
    /// carry zero.
    pub fn with_cost(mut self, amount: f64, currency: impl Into<String>) -> Self {
        self.cost_amount = amount;
        self.currency = currency.into();
        self
    }
}
