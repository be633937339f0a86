//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found. Also covers tenant-scoped lookups where the row
    /// exists but belongs to another tenant (existence must not leak).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Illegal campaign lifecycle transition
    #[error("invalid campaign status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
