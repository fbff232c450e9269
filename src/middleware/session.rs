// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session resolution middleware.
//!
//! The access token comes from the auth backend's session cookie (possibly
//! chunked across `name.0`, `name.1`, ...) or an `Authorization: Bearer`
//! header, and is verified by the backend. Resolution never fails a request;
//! an unusable token just means "no session".

use crate::db::AuthBackend;
use crate::error::AppError;
use crate::models::{Session, SessionTokens};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::Utc;
use std::sync::Arc;

/// Prefix the auth backend puts on base64-encoded cookie values.
const BASE64_PREFIX: &str = "base64-";

/// Upper bound on cookie chunks read for one session.
const MAX_CHUNKS: usize = 16;

/// Request-scoped result of session resolution.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub session: Option<Session>,
    /// Raw access token presented, even if it did not verify.
    pub access_token: Option<String>,
}

impl SessionContext {
    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.session.as_ref().map(|s| s.user_id)
    }
}

/// Global middleware: resolve the caller's session and store a
/// [`SessionContext`] in the request extensions.
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let context = resolve(
        state.backend.as_ref(),
        &jar,
        request.headers(),
        &state.config.session_cookie_name,
    )
    .await;

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Route middleware for protected API and page routes: require a session,
/// bootstrap the caller's profile and expose both as extensions.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<SessionContext>()
        .and_then(|ctx| ctx.session.clone())
        .ok_or(AppError::Unauthenticated)?;

    let profile = state.profiles.ensure_profile(&session).await?;

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(profile);

    Ok(next.run(request).await)
}

/// Resolve a session from cookies or headers.
pub async fn resolve<B: AuthBackend + ?Sized>(
    backend: &B,
    jar: &CookieJar,
    headers: &HeaderMap,
    cookie_name: &str,
) -> SessionContext {
    let Some(access_token) = access_token_from_request(jar, headers, cookie_name) else {
        return SessionContext::default();
    };

    let session = match backend.get_user(&access_token).await {
        Ok(Some(session)) if session.is_expired(Utc::now()) => {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            None
        }
        Ok(Some(session)) => Some(session),
        Ok(None) => {
            tracing::debug!("Auth backend rejected access token");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session verification failed");
            None
        }
    };

    SessionContext {
        session,
        access_token: Some(access_token),
    }
}

/// Extract the access token: session cookie first, then bearer header.
pub fn access_token_from_request(
    jar: &CookieJar,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Option<String> {
    if let Some(value) = session_cookie_value(jar, cookie_name) {
        match parse_session_cookie(&value) {
            Some(token) => return Some(token),
            None => tracing::debug!(cookie = cookie_name, "Undecodable session cookie"),
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Read the session cookie, joining chunks if it was split.
pub fn session_cookie_value(jar: &CookieJar, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }

    let mut value = String::new();
    for i in 0..MAX_CHUNKS {
        match jar.get(&format!("{}.{}", cookie_name, i)) {
            Some(chunk) => value.push_str(chunk.value()),
            None => break,
        }
    }

    (!value.is_empty()).then_some(value)
}

/// Decode a session cookie value into its access token.
///
/// Accepts `base64-<base64url(JSON)>`, plain (optionally percent-encoded)
/// JSON, or a bare JWT.
pub fn parse_session_cookie(value: &str) -> Option<String> {
    let value = value.trim();

    if let Some(encoded) = value.strip_prefix(BASE64_PREFIX) {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .or_else(|_| URL_SAFE.decode(encoded))
            .ok()?;
        let json = String::from_utf8(bytes).ok()?;
        return access_token_from_json(&json);
    }

    if value.starts_with('{') || value.starts_with('[') {
        return access_token_from_json(value);
    }

    if value.starts_with("%7B") || value.starts_with("%5B") {
        let decoded = urlencoding::decode(value).ok()?;
        return access_token_from_json(&decoded);
    }

    if value.split('.').count() == 3 {
        return Some(value.to_string());
    }

    None
}

/// Encode session tokens the way the auth backend's SSR helpers do.
pub fn encode_session_cookie(tokens: &SessionTokens) -> Result<String, AppError> {
    let json = serde_json::to_string(tokens)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session serialization failed: {}", e)))?;
    Ok(format!(
        "{}{}",
        BASE64_PREFIX,
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    ))
}

fn access_token_from_json(json: &str) -> Option<String> {
    // Older clients stored `[access_token, refresh_token, ...]`.
    if json.trim_start().starts_with('[') {
        let parts: Vec<serde_json::Value> = serde_json::from_str(json).ok()?;
        return parts
            .first()
            .and_then(|v| v.as_str())
            .map(str::to_string);
    }

    serde_json::from_str::<SessionTokens>(json)
        .ok()
        .map(|tokens| tokens.access_token)
        .filter(|t| !t.is_empty())
}
