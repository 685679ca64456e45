//! Attribution Error Types
//!
//! Centralized error handling for the plugin's HTTP surface. The tracking
//! core itself never fails: storage corruption degrades to "no attribution"
//! and consent denial is a suppression path, not an error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Attribution plugin errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttributionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown event type")]
    UnknownEventType,

    #[error("Tracking is disabled")]
    TrackingDisabled,

    #[error("Attribution service is not active")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AttributionError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AttributionError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AttributionError::UnknownEventType => (
                StatusCode::BAD_REQUEST,
                "unknown_event_type",
                self.to_string(),
            ),
            AttributionError::TrackingDisabled => (
                StatusCode::FORBIDDEN,
                "tracking_disabled",
                self.to_string(),
            ),
            AttributionError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                self.to_string(),
            ),
            AttributionError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                msg.clone(),
            ),
            AttributionError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}
