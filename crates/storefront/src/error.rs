//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Client-facing messages are always generic;
//! operational detail goes to logs only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::printful::PrintfulError;
use crate::stripe::StripeError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Catalog or fulfillment provider unreachable.
    #[error("Upstream error: {0}")]
    Upstream(#[from] PrintfulError),

    /// Payment processor call failed.
    #[error("Payment processor error: {0}")]
    PaymentProcessor(#[from] StripeError),

    /// Webhook signature verification failed.
    #[error("Authenticity error: {0}")]
    Authenticity(String),

    /// Malformed or missing fields in client input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Upstream(_) | Self::PaymentProcessor(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) | Self::PaymentProcessor(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Authenticity(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::PaymentProcessor(_) => "Failed to create checkout session".to_string(),
            Self::Upstream(_) => "External service error".to_string(),
            Self::Authenticity(_) => "Webhook signature verification failed".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(msg) => format!("Not found: {msg}"),
            Self::RateLimited => "Too many requests. Please try again later.".to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order cs_123".to_string());
        assert_eq!(err.to_string(), "Not found: order cs_123");

        let err = AppError::Validation("No items provided for checkout".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: No items provided for checkout"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Authenticity("bad signature".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::PaymentProcessor(StripeError::Api {
                status: 400,
                message: "bad".to_string()
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Upstream(PrintfulError::Api {
                status: 503,
                message: "down".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let response = AppError::Internal("connection string postgres://user:pw".to_string())
            .into_response();
        // The body is the generic message; the detail only reaches logs.
        // Status is the observable contract here.
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
