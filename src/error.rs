// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Google account not connected")]
    ProviderNotConnected,

    #[error("Calendar provider rejected the access token")]
    ProviderAuthExpired,

    #[error("Calendar provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Uniqueness conflict: {0}")]
    StorageConflict(String),

    #[error("OAuth callback carried neither a code nor an error")]
    MalformedCallback,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error came from the calendar provider (as opposed to storage).
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AppError::ProviderAuthExpired | AppError::ProviderRequestFailed(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::ProviderNotConnected => (
                StatusCode::BAD_REQUEST,
                "provider_not_connected",
                Some(self.to_string()),
            ),
            // Both provider failures look the same to the client; the logs tell them apart.
            AppError::ProviderAuthExpired => {
                tracing::error!(error = %self, "Calendar provider auth expired");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "calendar_request_failed",
                    Some("Failed to process calendar request".to_string()),
                )
            }
            AppError::ProviderRequestFailed(msg) => {
                tracing::error!(error = %msg, "Calendar provider request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "calendar_request_failed",
                    Some("Failed to process calendar request".to_string()),
                )
            }
            AppError::StorageConflict(msg) => {
                tracing::error!(error = %msg, "Unrecovered storage conflict");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::MalformedCallback => {
                (StatusCode::BAD_REQUEST, "malformed_callback", None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AppError::ProviderNotConnected, StatusCode::BAD_REQUEST),
            (
                AppError::ProviderAuthExpired,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::ProviderRequestFailed("HTTP 503".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::BadRequest("nope".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (
                AppError::Database("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_is_provider_error() {
        assert!(AppError::ProviderAuthExpired.is_provider_error());
        assert!(AppError::ProviderRequestFailed("timeout".to_string()).is_provider_error());
        assert!(!AppError::ProviderNotConnected.is_provider_error());
        assert!(!AppError::Database("x".to_string()).is_provider_error());
    }
}
