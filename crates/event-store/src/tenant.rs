//! Tenant operations. Tenants are created at signup and deactivated,
//! never deleted.

use sqlx::SqlitePool;

use crate::error::{Result, StoreError};
use crate::models::Tenant;

/// Create a tenant.
pub async fn create_tenant(pool: &SqlitePool, tenant: &Tenant) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tenants (id, name, active, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&tenant.id)
    .bind(&tenant.name)
    .bind(tenant.active)
    .bind(tenant.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return StoreError::AlreadyExists {
                    entity: "Tenant",
                    id: tenant.id.clone(),
                };
            }
        }
        StoreError::Sqlx(e)
    })?;

    Ok(())
}

/// Fetch a tenant by id.
pub async fn get_tenant(pool: &SqlitePool, tenant_id: &str) -> Result<Tenant> {
    let tenant = sqlx::query_as::<_, Tenant>(
        "SELECT id, name, active, created_at FROM tenants WHERE id = ?",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    tenant.ok_or_else(|| StoreError::NotFound {
        entity: "Tenant",
        id: tenant_id.to_string(),
    })
}

/// Deactivate a tenant. Its data stays; new work for it should stop.
pub async fn deactivate_tenant(pool: &SqlitePool, tenant_id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE tenants SET active = 0 WHERE id = ?")
        .bind(tenant_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Tenant",
            id: tenant_id.to_string(),
        });
    }

    Ok(())
}
