//! Append and range-scan operations over the campaign event log.
//!
//! The log is append-only: nothing here updates or deletes a row. Two scan
//! shapes are served, both index-backed: ordered-by-id fetches for the
//! ingestion feed, and `(tenant_id, campaign_id, occurred_at)` window scans
//! for the query engine.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{CampaignEvent, NewCampaignEvent};

/// Append a single event and return it with its assigned id.
pub async fn append_event(pool: &SqlitePool, event: &NewCampaignEvent) -> Result<CampaignEvent> {
    let created_at = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO campaign_events (
            tenant_id, campaign_id, contact_id, channel, event_type,
            occurred_at, created_at, provider_message_id, failure_reason,
            failure_code, ab_group, cost_amount, currency, user_agent_hash
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.tenant_id)
    .bind(&event.campaign_id)
    .bind(&event.contact_id)
    .bind(event.channel)
    .bind(event.event_type)
    .bind(event.occurred_at)
    .bind(created_at)
    .bind(&event.provider_message_id)
    .bind(&event.failure_reason)
    .bind(&event.failure_code)
    .bind(event.ab_group)
    .bind(event.cost_amount)
    .bind(&event.currency)
    .bind(&event.user_agent_hash)
    .execute(pool)
    .await?;

    Ok(CampaignEvent {
        id: result.last_insert_rowid(),
        tenant_id: event.tenant_id.clone(),
        campaign_id: event.campaign_id.clone(),
        contact_id: event.contact_id.clone(),
        channel: event.channel,
        event_type: event.event_type,
        occurred_at: event.occurred_at,
        created_at,
        provider_message_id: event.provider_message_id.clone(),
        failure_reason: event.failure_reason.clone(),
        failure_code: event.failure_code.clone(),
        ab_group: event.ab_group,
        cost_amount: event.cost_amount,
        currency: event.currency.clone(),
        user_agent_hash: event.user_agent_hash.clone(),
    })
}

/// Append a batch of events in one transaction, returning the assigned ids.
pub async fn append_events(pool: &SqlitePool, events: &[NewCampaignEvent]) -> Result<Vec<i64>> {
    let created_at = Utc::now();
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(events.len());

    for event in events {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_events (
                tenant_id, campaign_id, contact_id, channel, event_type,
                occurred_at, created_at, provider_message_id, failure_reason,
                failure_code, ab_group, cost_amount, currency, user_agent_hash
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.tenant_id)
        .bind(&event.campaign_id)
        .bind(&event.contact_id)
        .bind(event.channel)
        .bind(event.event_type)
        .bind(event.occurred_at)
        .bind(created_at)
        .bind(&event.provider_message_id)
        .bind(&event.failure_reason)
        .bind(&event.failure_code)
        .bind(event.ab_group)
        .bind(event.cost_amount)
        .bind(&event.currency)
        .bind(&event.user_agent_hash)
        .execute(&mut *tx)
        .await?;

        ids.push(result.last_insert_rowid());
    }

    tx.commit().await?;
    Ok(ids)
}

/// Fetch up to `limit` events with id strictly greater than `last_id`,
/// ordered by id. This is the ingestion feed's scan.
pub async fn fetch_after(
    pool: &SqlitePool,
    last_id: i64,
    limit: i64,
) -> Result<Vec<CampaignEvent>> {
    let events = sqlx::query_as::<_, CampaignEvent>(
        r#"
        SELECT id, tenant_id, campaign_id, contact_id, channel, event_type,
               occurred_at, created_at, provider_message_id, failure_reason,
               failure_code, ab_group, cost_amount, currency, user_agent_hash
        FROM campaign_events
        WHERE id > ?
        ORDER BY id ASC
        LIMIT ?
        "#,
    )
    .bind(last_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Fetch all events for one tenant's campaign with `occurred_at` in
/// `[from, to]`, ordered by occurrence time. This is the query engine's scan.
pub async fn events_in_window(
    pool: &SqlitePool,
    tenant_id: &str,
    campaign_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<CampaignEvent>> {
    let events = sqlx::query_as::<_, CampaignEvent>(
        r#"
        SELECT id, tenant_id, campaign_id, contact_id, channel, event_type,
               occurred_at, created_at, provider_message_id, failure_reason,
               failure_code, ab_group, cost_amount, currency, user_agent_hash
        FROM campaign_events
        WHERE tenant_id = ? AND campaign_id = ?
          AND occurred_at >= ? AND occurred_at <= ?
        ORDER BY occurred_at ASC
        "#,
    )
    .bind(tenant_id)
    .bind(campaign_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, EventType};
    use crate::EventStore;
    use chrono::Duration;

    async fn test_db() -> EventStore {
        let store = EventStore::connect("sqlite::memory:").await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn sent(contact: &str, occurred_at: DateTime<Utc>) -> NewCampaignEvent {
        NewCampaignEvent::new("t1", "c1", contact, Channel::Email, EventType::Sent, occurred_at)
            .with_cost(0.004, "USD")
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids() {
        let store = test_db().await;
        let now = Utc::now();

        let a = append_event(store.pool(), &sent("alice", now)).await.unwrap();
        let b = append_event(store.pool(), &sent("bob", now)).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.cost_amount, 0.004);
    }

    #[tokio::test]
    async fn test_batch_append_and_fetch_after() {
        let store = test_db().await;
        let now = Utc::now();

        let batch: Vec<_> = (0..5).map(|i| sent(&format!("contact-{i}"), now)).collect();
        let ids = append_events(store.pool(), &batch).await.unwrap();
        assert_eq!(ids.len(), 5);

        let all = fetch_after(store.pool(), 0, 10).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let tail = fetch_after(store.pool(), all[2].id, 10).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].id, ids[4]);
    }

    #[tokio::test]
    async fn test_window_scan_is_tenant_and_time_bounded() {
        let store = test_db().await;
        let now = Utc::now();

        append_event(store.pool(), &sent("in-window", now)).await.unwrap();
        append_event(store.pool(), &sent("too-old", now - Duration::hours(3)))
            .await
            .unwrap();

        let mut other_tenant = sent("other", now);
        other_tenant.tenant_id = "t2".to_string();
        append_event(store.pool(), &other_tenant).await.unwrap();

        let events =
            events_in_window(store.pool(), "t1", "c1", now - Duration::hours(1), now)
                .await
                .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].contact_id, "in-window");
    }
}
