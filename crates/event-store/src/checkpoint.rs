//! Consumer checkpoints for the ingestion feed.
//!
//! A checkpoint records the highest event id a named consumer has fully
//! applied, so a restart resumes without reprocessing from zero. Delivery
//! stays at-least-once: a crash between apply and checkpoint re-delivers
//! the tail, which the consumer deduplicates.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Result;

/// Load a consumer's checkpoint. Returns 0 for a consumer that has never
/// committed one.
pub async fn load(pool: &SqlitePool, consumer: &str) -> Result<i64> {
    let last_id = sqlx::query_scalar::<_, i64>(
        "SELECT last_event_id FROM consumer_checkpoints WHERE consumer = ?",
    )
    .bind(consumer)
    .fetch_optional(pool)
    .await?;

    Ok(last_id.unwrap_or(0))
}

/// Store a consumer's checkpoint, replacing any previous one.
pub async fn store(pool: &SqlitePool, consumer: &str, last_event_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO consumer_checkpoints (consumer, last_event_id, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(consumer) DO UPDATE SET
            last_event_id = excluded.last_event_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(consumer)
    .bind(last_event_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStore;

    #[tokio::test]
    async fn test_checkpoint_round_trip() {
        let db = EventStore::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        assert_eq!(load(db.pool(), "aggregator").await.unwrap(), 0);

        store(db.pool(), "aggregator", 42).await.unwrap();
        assert_eq!(load(db.pool(), "aggregator").await.unwrap(), 42);

        store(db.pool(), "aggregator", 99).await.unwrap();
        assert_eq!(load(db.pool(), "aggregator").await.unwrap(), 99);

        // Checkpoints are per consumer.
        assert_eq!(load(db.pool(), "reporting").await.unwrap(), 0);
    }
}
