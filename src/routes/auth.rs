// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login session routes: PKCE callback from the auth backend and logout.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::session::{encode_session_cookie, SessionContext};
use crate::AppState;

/// Largest value written into a single session cookie before chunking.
pub const MAX_COOKIE_CHUNK: usize = 3180;

/// Session cookie lifetime; the access token inside expires much sooner.
const SESSION_COOKIE_DAYS: i64 = 400;

const DEFAULT_NEXT: &str = "/profile";

/// Most chunk slots cleared on logout.
const MAX_CLEARED_CHUNKS: usize = 16;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/callback", get(login_callback))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginCallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    next: Option<String>,
}

/// Exchange the auth backend's login code for a session cookie.
async fn login_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<LoginCallbackParams>,
) -> (CookieJar, Redirect) {
    let next = safe_next(params.next.as_deref());
    let cookie_name = &state.config.session_cookie_name;
    let verifier_name = code_verifier_cookie_name(cookie_name);

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("Login callback without code");
        return (jar, Redirect::to("/login"));
    };

    let Some(code_verifier) = jar
        .get(&verifier_name)
        .and_then(|c| decode_code_verifier(c.value()))
    else {
        tracing::warn!("Login callback without PKCE code verifier");
        return (jar, Redirect::to("/login"));
    };

    let tokens = match state
        .backend
        .exchange_code_for_session(&code, &code_verifier)
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "Login code exchange failed");
            return (jar, Redirect::to("/login"));
        }
    };

    let value = match encode_session_cookie(&tokens) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode session cookie");
            return (jar, Redirect::to("/login"));
        }
    };

    tracing::info!(
        user_id = ?tokens.user.as_ref().map(|u| u.id),
        "Login session established"
    );

    let jar = clear_session_cookies(jar, &state.config);
    let jar = jar.add(removal_cookie(verifier_name, &state.config));
    let jar = set_session_cookies(jar, &state.config, value);

    (jar, Redirect::to(&next))
}

/// Revoke the session (best effort) and clear its cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<SessionContext>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(token) = ctx.access_token.as_deref() {
        if let Err(e) = state.backend.sign_out(token).await {
            tracing::warn!(error = %e, "Backend sign-out failed, clearing cookie anyway");
        }
    }

    if let Some(user_id) = ctx.user_id() {
        tracing::info!(user_id = %user_id, "User logged out");
    }

    (clear_session_cookies(jar, &state.config), Redirect::to("/"))
}

/// Name of the PKCE verifier cookie written next to the session cookie.
pub fn code_verifier_cookie_name(session_cookie_name: &str) -> String {
    format!("{}-code-verifier", session_cookie_name)
}

/// Write the session cookie, split into `name.0`, `name.1`, ... when large.
fn set_session_cookies(jar: CookieJar, config: &Config, value: String) -> CookieJar {
    let name = &config.session_cookie_name;

    if value.len() <= MAX_COOKIE_CHUNK {
        return jar.add(session_cookie(name.clone(), value, config));
    }

    // Base64 and JSON are ASCII, so byte chunks are valid strings.
    value
        .as_bytes()
        .chunks(MAX_COOKIE_CHUNK)
        .enumerate()
        .fold(jar, |jar, (i, chunk)| {
            let chunk = String::from_utf8_lossy(chunk).into_owned();
            jar.add(session_cookie(format!("{}.{}", name, i), chunk, config))
        })
}

/// Expire the session cookie and every chunk slot.
fn clear_session_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    let name = &config.session_cookie_name;
    let jar = jar.add(removal_cookie(name.clone(), config));

    (0..MAX_CLEARED_CHUNKS).fold(jar, |jar, i| {
        let chunk_name = format!("{}.{}", name, i);
        if jar.get(&chunk_name).is_some() {
            jar.add(removal_cookie(chunk_name, config))
        } else {
            jar
        }
    })
}

fn session_cookie(name: String, value: String, config: &Config) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookies_secure())
        .max_age(time::Duration::days(SESSION_COOKIE_DAYS))
        .build()
}

fn removal_cookie(name: String, config: &Config) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookies_secure())
        .max_age(time::Duration::ZERO)
        .build()
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => DEFAULT_NEXT.to_string(),
    }
}

/// The verifier cookie holds a JSON string, possibly `base64-` encoded.
fn decode_code_verifier(value: &str) -> Option<String> {
    let raw = match value.strip_prefix("base64-") {
        Some(encoded) => {
            String::from_utf8(URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?).ok()?
        }
        None => urlencoding::decode(value).ok()?.into_owned(),
    };

    let verifier = serde_json::from_str::<String>(&raw).unwrap_or(raw);
    (!verifier.is_empty()).then_some(verifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(None), "/profile");
        assert_eq!(safe_next(Some("/dashboard")), "/dashboard");
        assert_eq!(safe_next(Some("//evil.example")), "/profile");
        assert_eq!(safe_next(Some("https://evil.example")), "/profile");
        assert_eq!(safe_next(Some("/\\evil.example")), "/profile");
        assert_eq!(safe_next(Some("/a\r\nSet-Cookie: x=y")), "/profile");
        assert_eq!(safe_next(Some("/tab\there")), "/profile");
    }

    #[test]
    fn test_decode_code_verifier() {
        assert_eq!(decode_code_verifier("plain").as_deref(), Some("plain"));
        assert_eq!(decode_code_verifier("%22quoted%22").as_deref(), Some("quoted"));

        let encoded = format!("base64-{}", URL_SAFE_NO_PAD.encode("\"v123\""));
        assert_eq!(decode_code_verifier(&encoded).as_deref(), Some("v123"));
        assert_eq!(decode_code_verifier(""), None);
    }

    #[test]
    fn test_large_session_is_chunked() {
        let config = Config::test_default();
        let value = "a".repeat(MAX_COOKIE_CHUNK * 2 + 10);

        let jar = set_session_cookies(CookieJar::new(), &config, value.clone());
        let name = &config.session_cookie_name;

        assert!(jar.get(name).is_none());
        let joined: String = (0..3)
            .map(|i| jar.get(&format!("{}.{}", name, i)).unwrap().value().to_string())
            .collect();
        assert_eq!(joined, value);
        assert!(jar.get(&format!("{}.3", name)).is_none());
    }
}
