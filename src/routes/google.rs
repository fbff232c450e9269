// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar connection: consent URL and OAuth callback.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::session::SessionContext;
use crate::models::{CalendarProvider, OAuthToken, Session};
use crate::services::google_oauth::TOKEN_EXCHANGE_FAILED;
use crate::AppState;

pub const CONNECTED_REDIRECT: &str = "/dashboard?success=google_connected";

/// Routes that need a session (wrapped by `require_session`).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/google/url", get(auth_url))
}

/// Routes that resolve the session themselves.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/callback", get(callback))
}

#[derive(Serialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

/// Consent URL with a state value bound to the caller.
async fn auth_url(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<AuthUrlResponse>> {
    let oauth_state = state.google_oauth.sign_state(session.user_id, Utc::now())?;
    let url = state.google_oauth.authorization_url(&oauth_state);

    tracing::info!(user_id = %session.user_id, "Issued Google consent URL");
    Ok(Json(AuthUrlResponse { url }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Why a calendar connection attempt failed; rendered into `/?error=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    /// Google redirected back with `error=...`.
    Provider(String),
    NoCode,
    /// The query string could not be parsed.
    Malformed,
    InvalidState,
    TokenExchange(String),
    NotAuthenticated,
    TokenStorage,
}

impl ConnectFailure {
    pub fn reason(&self) -> &str {
        match self {
            ConnectFailure::Provider(e) => e,
            ConnectFailure::NoCode => "no_code",
            ConnectFailure::Malformed => "malformed_callback",
            ConnectFailure::InvalidState => "invalid_state",
            ConnectFailure::TokenExchange(code) => code,
            ConnectFailure::NotAuthenticated => "not_authenticated",
            ConnectFailure::TokenStorage => "token_storage_failed",
        }
    }

    fn redirect(&self) -> Redirect {
        Redirect::to(&format!("/?error={}", urlencoding::encode(self.reason())))
    }
}

/// OAuth redirect target. Always answers with a 303.
async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    params: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> Redirect {
    let outcome = match params {
        Ok(Query(params)) => connect(&state, &ctx, params).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unparseable OAuth callback query");
            Err(ConnectFailure::Malformed)
        }
    };

    match outcome {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "Google Calendar connected");
            Redirect::to(CONNECTED_REDIRECT)
        }
        Err(failure) => {
            tracing::warn!(reason = failure.reason(), "Google Calendar connection failed");
            failure.redirect()
        }
    }
}

async fn connect(
    state: &AppState,
    ctx: &SessionContext,
    params: CallbackParams,
) -> std::result::Result<uuid::Uuid, ConnectFailure> {
    if let Some(error) = params.error {
        return Err(ConnectFailure::Provider(error));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ConnectFailure::NoCode)?;

    let now = Utc::now();
    let state_user = params
        .state
        .as_deref()
        .and_then(|s| state.google_oauth.verify_state(s, now))
        .ok_or(ConnectFailure::InvalidState)?;

    let grant = state
        .google_oauth
        .exchange_code(&code)
        .await
        .map_err(|e| match e {
            AppError::ProviderRequestFailed(code) => ConnectFailure::TokenExchange(code),
            other => {
                tracing::error!(error = %other, "Unexpected token exchange failure");
                ConnectFailure::TokenExchange(TOKEN_EXCHANGE_FAILED.to_string())
            }
        })?;

    let session = ctx
        .session
        .as_ref()
        .ok_or(ConnectFailure::NotAuthenticated)?;

    if session.user_id != state_user {
        tracing::warn!(
            user_id = %session.user_id,
            state_user = %state_user,
            "OAuth state minted for a different user"
        );
        return Err(ConnectFailure::InvalidState);
    }

    let token = OAuthToken {
        user_id: session.user_id,
        provider: CalendarProvider::Google,
        expires_at: grant.expires_at(now),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        updated_at: now,
    };

    state.backend.upsert_token(&token).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %session.user_id, "Failed to store calendar token");
        ConnectFailure::TokenStorage
    })?;

    Ok(session.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reasons() {
        assert_eq!(ConnectFailure::NoCode.reason(), "no_code");
        assert_eq!(ConnectFailure::Malformed.reason(), "malformed_callback");
        assert_eq!(ConnectFailure::TokenStorage.reason(), "token_storage_failed");
        assert_eq!(
            ConnectFailure::TokenExchange("invalid_grant".to_string()).reason(),
            "invalid_grant"
        );
        assert_eq!(
            ConnectFailure::Provider("access_denied".to_string()).reason(),
            "access_denied"
        );
    }
}
