// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth for calendar access.
//!
//! Builds the consent URL, signs and verifies the `state` round-trip value,
//! and exchanges authorization codes at the token endpoint.

use crate::config::Config;
use crate::error::AppError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Scopes requested on the consent screen.
pub const CALENDAR_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Maximum age of a signed OAuth state value, in seconds.
pub const STATE_MAX_AGE_SECS: i64 = 600;

/// Fallback failure reason when Google gives no error code.
pub const TOKEN_EXCHANGE_FAILED: &str = "token_exchange_failed";

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    state_key: Vec<u8>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry in Unix milliseconds.
    #[serde(default)]
    pub expiry_date: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// Absolute expiry: `expiry_date` if given, else `now + expires_in`.
    /// Values outside chrono's range are treated as no expiry.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(ms) = self.expiry_date {
            return DateTime::from_timestamp_millis(ms);
        }
        self.expires_in
            .and_then(Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            state_key: config.oauth_state_key.clone(),
        })
    }

    /// Consent URL for offline calendar access.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&\
             scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&CALENDAR_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// On failure the error carries Google's `error` code (e.g.
    /// `invalid_grant`) or `token_exchange_failed`.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token exchange request failed");
                AppError::ProviderRequestFailed(TOKEN_EXCHANGE_FAILED.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<TokenErrorBody>(&body).ok();
            let code = parsed
                .as_ref()
                .and_then(|b| b.error.clone())
                .filter(|c| is_error_code(c))
                .unwrap_or_else(|| TOKEN_EXCHANGE_FAILED.to_string());

            tracing::warn!(
                status = %status,
                error = %code,
                description = parsed
                    .as_ref()
                    .and_then(|b| b.error_description.as_deref())
                    .unwrap_or(""),
                "Google rejected authorization code"
            );
            return Err(AppError::ProviderRequestFailed(code));
        }

        response.json::<TokenGrant>().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse token response");
            AppError::ProviderRequestFailed(TOKEN_EXCHANGE_FAILED.to_string())
        })
    }

    /// Mint a state value bound to `user_id`.
    pub fn sign_state(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        let payload = format!("{}|{:x}", user_id, now.timestamp_millis());
        let signature = self.mac(&payload)?;
        let signed = format!("{}|{}", payload, hex::encode(signature));
        Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
    }

    /// Verify a state value and return the user it was minted for.
    ///
    /// Rejects bad signatures, malformed values and anything older than
    /// [`STATE_MAX_AGE_SECS`] (or from the future).
    pub fn verify_state(&self, state: &str, now: DateTime<Utc>) -> Option<Uuid> {
        let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
        let state_str = String::from_utf8(bytes).ok()?;

        // "user_id|timestamp_hex|signature_hex"
        let mut parts = state_str.splitn(3, '|');
        let user_id = parts.next()?;
        let timestamp_hex = parts.next()?;
        let signature_hex = parts.next()?;

        let payload = format!("{}|{}", user_id, timestamp_hex);
        let expected = self.mac(&payload).ok()?;
        let provided = hex::decode(signature_hex).ok()?;

        if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            tracing::warn!("OAuth state signature mismatch");
            return None;
        }

        let issued_ms = i64::from_str_radix(timestamp_hex, 16).ok()?;
        let issued = DateTime::from_timestamp_millis(issued_ms)?;
        let age = now - issued;
        if age < Duration::zero() || age > Duration::seconds(STATE_MAX_AGE_SECS) {
            tracing::warn!(age_secs = age.num_seconds(), "OAuth state expired");
            return None;
        }

        user_id.parse().ok()
    }

    fn mac(&self, payload: &str) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.state_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// OAuth error codes are short snake_case tokens; anything else is not
/// echoed into a redirect.
fn is_error_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 64
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
