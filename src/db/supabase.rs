// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Auth (GoTrue): session verification, PKCE login exchange, sign-out
//! - Profiles (PostgREST `profiles` table)
//! - Calendar tokens (PostgREST `calendar_tokens` table)
//! - Tutorials (PostgREST `tutorials` table, read-only)
//! - Schema administration (the `execute_sql` RPC)
//!
//! Row operations run with the service role key; the server is the trusted party
//! and scopes every query to the session's user ID itself.

use crate::db::{tables, AuthBackend, ProfileStore, SchemaAdmin, TokenStore, TutorialStore};
use crate::error::AppError;
use crate::models::{
    CalendarProvider, IdentityUser, NewProfile, OAuthToken, Profile, ProfileUpdate, Session,
    SessionTokens, Tutorial,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supabase REST client.
#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

impl SupabaseDb {
    /// Create a new Supabase client for a project URL.
    pub fn new(base_url: &str, anon_key: &str, service_role_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Database(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(url = base_url, "Supabase client initialized");

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    // ─── Request Helpers ─────────────────────────────────────────

    /// Request against PostgREST, authenticated as the service role.
    fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    /// Request against GoTrue, authenticated with the anon key plus an optional user token.
    fn auth(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key);

        match access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, AppError> {
        request
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Supabase request failed: {}", e)))
    }

    /// Check response status and map PostgREST errors.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error: PostgrestError = serde_json::from_str(&body).unwrap_or_default();

        if status == StatusCode::CONFLICT || error.code.as_deref() == Some(UNIQUE_VIOLATION) {
            return Err(AppError::StorageConflict(
                error.message.unwrap_or_else(|| body.clone()),
            ));
        }

        Err(AppError::Database(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Database(format!("JSON parse error: {}", e)))
    }

    /// Read the `exp` claim of a token the backend has already accepted.
    fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data =
            decode::<ExpiryClaims>(access_token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp, 0)
    }
}

#[async_trait]
impl AuthBackend for SupabaseDb {
    async fn get_user(&self, access_token: &str) -> Result<Option<Session>, AppError> {
        let response = self
            .send(self.auth(Method::GET, "user", Some(access_token)))
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }

        let user: IdentityUser = self.check_response_json(response).await?;

        let Some(expires_at) = Self::token_expiry(access_token) else {
            tracing::warn!(user_id = %user.id, "Accepted access token has no readable exp claim");
            return Ok(None);
        };

        Ok(Some(Session::from_identity(user, expires_at)))
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<SessionTokens, AppError> {
        let body = serde_json::json!({
            "auth_code": auth_code,
            "code_verifier": code_verifier,
        });

        let response = self
            .send(
                self.auth(Method::POST, "token", None)
                    .query(&[("grant_type", "pkce")])
                    .json(&body),
            )
            .await?;

        self.check_response_json(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .send(self.auth(Method::POST, "logout", Some(access_token)))
            .await?;
        self.check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SupabaseDb {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let response = self
            .send(self.rest(Method::GET, tables::PROFILES).query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ]))
            .await?;

        let rows: Vec<Profile> = self.check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<Profile, AppError> {
        let response = self
            .send(
                self.rest(Method::POST, tables::PROFILES)
                    .header("Prefer", "return=representation")
                    .json(profile),
            )
            .await?;

        let rows: Vec<Profile> = self.check_response_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Profile insert returned no rows".to_string()))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, AppError> {
        let mut body = serde_json::to_value(update)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Serialize update: {}", e)))?;
        body["updated_at"] = serde_json::Value::String(Utc::now().to_rfc3339());

        let response = self
            .send(
                self.rest(Method::PATCH, tables::PROFILES)
                    .query(&[("user_id", format!("eq.{}", user_id))])
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;

        let rows: Vec<Profile> = self.check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl TokenStore for SupabaseDb {
    async fn get_token(
        &self,
        user_id: Uuid,
        provider: CalendarProvider,
    ) -> Result<Option<OAuthToken>, AppError> {
        let response = self
            .send(self.rest(Method::GET, tables::CALENDAR_TOKENS).query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("provider", format!("eq.{}", provider.as_str())),
                ("select", "*".to_string()),
                ("limit", "1".to_string()),
            ]))
            .await?;

        let rows: Vec<OAuthToken> = self.check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError> {
        let response = self
            .send(
                self.rest(Method::POST, tables::CALENDAR_TOKENS)
                    .query(&[("on_conflict", "user_id,provider")])
                    .header("Prefer", "resolution=merge-duplicates,return=minimal")
                    .json(token),
            )
            .await?;

        self.check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TutorialStore for SupabaseDb {
    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, AppError> {
        let response = self
            .send(self.rest(Method::GET, tables::TUTORIALS).query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
            ]))
            .await?;

        self.check_response_json(response).await
    }
}

#[async_trait]
impl SchemaAdmin for SupabaseDb {
    async fn execute_sql(&self, sql: &str) -> Result<(), AppError> {
        let response = self
            .send(
                self.rest(Method::POST, "rpc/execute_sql")
                    .json(&serde_json::json!({ "query": sql })),
            )
            .await?;

        self.check_response(response).await?;
        Ok(())
    }
}
