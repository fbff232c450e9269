// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use learn_together::error::AppError;

#[test]
fn test_is_provider_error_matches() {
    assert!(AppError::ProviderAuthExpired.is_provider_error());
    assert!(AppError::ProviderRequestFailed("HTTP 503".to_string()).is_provider_error());
}

#[test]
fn test_is_provider_error_no_match() {
    assert!(!AppError::ProviderNotConnected.is_provider_error());
    assert!(!AppError::Database("timeout".to_string()).is_provider_error());
    assert!(!AppError::StorageConflict("dup".to_string()).is_provider_error());
}

#[test]
fn test_provider_errors_are_indistinguishable_to_clients() {
    let expired = AppError::ProviderAuthExpired.into_response();
    let failed = AppError::ProviderRequestFailed("HTTP 500".to_string()).into_response();

    assert_eq!(expired.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
