//! Error types for the metrics API.

use analytics::AnalyticsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use event_store::StoreError;
use thiserror::Error;

/// Errors that can occur while serving metrics requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request arrived without a tenant identity.
    #[error("missing or empty X-Tenant-Id header")]
    MissingTenant,

    /// Query engine error (validation, not-found, or store failure).
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// No aggregator snapshot has been published yet.
    #[error("aggregator metrics unavailable")]
    AggregatorUnavailable,

    /// Store error outside the query engine.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingTenant => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Analytics(AnalyticsError::InvalidWindow(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // Tenant mismatch and nonexistence both land here: never a
            // distinct "forbidden" signal.
            ApiError::Analytics(AnalyticsError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Analytics(AnalyticsError::Store(err)) => {
                tracing::error!("Store error during metrics query: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::AggregatorUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::MissingTenant, StatusCode::UNAUTHORIZED),
            (
                ApiError::Analytics(AnalyticsError::InvalidWindow(2000)),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Analytics(AnalyticsError::NotFound("c1".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::AggregatorUnavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
