//! Campaign operations.
//!
//! Lookups are tenant-scoped: a campaign that exists but belongs to another
//! tenant is indistinguishable from a missing one.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Result, StoreError};
use crate::models::{Campaign, CampaignStatus};

/// Create a campaign.
pub async fn create_campaign(pool: &SqlitePool, campaign: &Campaign) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO campaigns (
            id, tenant_id, name, status, channels, scheduled_at, started_at,
            finished_at, sent_count, success_count, failed_count, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&campaign.id)
    .bind(&campaign.tenant_id)
    .bind(&campaign.name)
    .bind(campaign.status)
    .bind(&campaign.channels)
    .bind(campaign.scheduled_at)
    .bind(campaign.started_at)
    .bind(campaign.finished_at)
    .bind(campaign.sent_count)
    .bind(campaign.success_count)
    .bind(campaign.failed_count)
    .bind(campaign.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return StoreError::AlreadyExists {
                    entity: "Campaign",
                    id: campaign.id.clone(),
                };
            }
        }
        StoreError::Sqlx(e)
    })?;

    Ok(())
}

/// Fetch a campaign scoped to its tenant.
///
/// Returns `NotFound` both when the id does not exist and when it belongs
/// to a different tenant.
pub async fn get_campaign(
    pool: &SqlitePool,
    campaign_id: &str,
    tenant_id: &str,
) -> Result<Campaign> {
    let campaign = sqlx::query_as::<_, Campaign>(
        r#"
        SELECT id, tenant_id, name, status, channels, scheduled_at, started_at,
               finished_at, sent_count, success_count, failed_count, created_at
        FROM campaigns
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(campaign_id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    campaign.ok_or_else(|| StoreError::NotFound {
        entity: "Campaign",
        id: campaign_id.to_string(),
    })
}

/// Advance a campaign's lifecycle state, enforcing legal transitions.
pub async fn update_status(
    pool: &SqlitePool,
    campaign_id: &str,
    tenant_id: &str,
    next: CampaignStatus,
) -> Result<()> {
    let campaign = get_campaign(pool, campaign_id, tenant_id).await?;

    if !campaign.status.can_transition_to(next) {
        return Err(StoreError::InvalidTransition {
            from: campaign.status.to_string(),
            to: next.to_string(),
        });
    }

    let now = Utc::now();
    let started_at = if next == CampaignStatus::Sending && campaign.started_at.is_none() {
        Some(now)
    } else {
        campaign.started_at
    };
    let finished_at = match next {
        CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Cancelled => Some(now),
        _ => campaign.finished_at,
    };

    sqlx::query(
        r#"
        UPDATE campaigns
        SET status = ?, started_at = ?, finished_at = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(next)
    .bind(started_at)
    .bind(finished_at)
    .bind(campaign_id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply counter deltas to the campaign read-model projection.
///
/// The event log is authoritative; these columns exist so list views can
/// render without scanning events. Populated asynchronously by the
/// aggregator after each batch.
pub async fn apply_counter_deltas(
    pool: &SqlitePool,
    campaign_id: &str,
    sent: i64,
    success: i64,
    failed: i64,
) -> Result<()> {
    if sent == 0 && success == 0 && failed == 0 {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE campaigns
        SET sent_count = sent_count + ?,
            success_count = success_count + ?,
            failed_count = failed_count + ?
        WHERE id = ?
        "#,
    )
    .bind(sent)
    .bind(success)
    .bind(failed)
    .bind(campaign_id)
    .execute(pool)
    .await?;

    Ok(())
}
