//! Query engine error types.

use event_store::StoreError;
use thiserror::Error;

/// Errors that can occur while computing campaign metrics.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// `windowMinutes` outside the allowed range. Raised before any store
    /// scan executes.
    #[error("invalid windowMinutes {0}: must be between {min} and {max}",
        min = crate::query::MIN_WINDOW_MINUTES,
        max = crate::query::MAX_WINDOW_MINUTES)]
    InvalidWindow(i64),

    /// Campaign missing, or owned by another tenant. The two cases are
    /// indistinguishable on purpose.
    #[error("campaign not found: {0}")]
    NotFound(String),

    /// Store failure during the window scan.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for query engine operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
