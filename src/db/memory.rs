// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for local development and tests.
//!
//! Sessions are HS256 JWTs shaped like the ones Supabase Auth issues, signed
//! with `SESSION_JWT_SECRET`. Rows live in concurrent maps; the `profiles`
//! uniqueness constraint on `user_id` is enforced atomically per key.

use crate::db::{AuthBackend, ProfileStore, SchemaAdmin, TokenStore, TutorialStore};
use crate::error::AppError;
use crate::models::{
    CalendarProvider, IdentityUser, NewProfile, OAuthToken, Profile, ProfileUpdate, Session,
    SessionTokens, Tutorial, UserMetadata,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

const AUDIENCE: &str = "authenticated";

/// Claims carried by a session access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (auth user ID)
    pub sub: String,
    pub email: String,
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub session_id: Uuid,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

struct PendingLogin {
    code_verifier: String,
    user: IdentityUser,
}

/// In-memory backend.
pub struct MemoryDb {
    session_secret: Vec<u8>,
    profiles: DashMap<Uuid, Profile>,
    tokens: DashMap<(Uuid, CalendarProvider), OAuthToken>,
    tutorials: DashMap<Uuid, Tutorial>,
    pending_logins: DashMap<String, PendingLogin>,
    revoked_sessions: DashSet<Uuid>,
    executed_sql: Mutex<Vec<String>>,
    read_only: AtomicBool,
    tutorials_offline: AtomicBool,
}

impl MemoryDb {
    pub fn new(session_secret: &[u8]) -> Self {
        Self {
            session_secret: session_secret.to_vec(),
            profiles: DashMap::new(),
            tokens: DashMap::new(),
            tutorials: DashMap::new(),
            pending_logins: DashMap::new(),
            revoked_sessions: DashSet::new(),
            executed_sql: Mutex::new(Vec::new()),
            read_only: AtomicBool::new(false),
            tutorials_offline: AtomicBool::new(false),
        }
    }

    // ─── Session Issuing ─────────────────────────────────────────

    /// Issue a session for a user, valid for `ttl`.
    pub fn issue_session(
        &self,
        user: &IdentityUser,
        ttl: Duration,
    ) -> Result<SessionTokens, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone().unwrap_or_default(),
            aud: AUDIENCE.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            session_id: Uuid::new_v4(),
            user_metadata: user.user_metadata.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.session_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok(SessionTokens {
            access_token,
            refresh_token: Some(Uuid::new_v4().simple().to_string()),
            token_type: Some("bearer".to_string()),
            expires_in: Some(ttl.num_seconds()),
            expires_at: Some(expires_at.timestamp()),
            user: Some(user.clone()),
        })
    }

    /// Register a PKCE login code that `exchange_code_for_session` will accept once.
    pub fn register_login_code(&self, code: &str, code_verifier: &str, user: IdentityUser) {
        self.pending_logins.insert(
            code.to_string(),
            PendingLogin {
                code_verifier: code_verifier.to_string(),
                user,
            },
        );
    }

    fn decode_claims(&self, access_token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.leeway = 0;

        decode::<SessionClaims>(
            access_token,
            &DecodingKey::from_secret(&self.session_secret),
            &validation,
        )
        .map(|data| data.claims)
        .ok()
    }

    /// Seed a tutorial row.
    pub fn add_tutorial(&self, tutorial: Tutorial) {
        self.tutorials.insert(tutorial.id, tutorial);
    }

    // ─── Inspection ──────────────────────────────────────────────

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub async fn executed_sql(&self) -> Vec<String> {
        self.executed_sql.lock().await.clone()
    }

    /// Reject all writes with a database error (simulates a storage outage).
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Fail reads of `tutorials` (simulates a missing table).
    pub fn set_tutorials_offline(&self, offline: bool) {
        self.tutorials_offline.store(offline, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(AppError::Database("Backend is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for MemoryDb {
    async fn get_user(&self, access_token: &str) -> Result<Option<Session>, AppError> {
        let Some(claims) = self.decode_claims(access_token) else {
            return Ok(None);
        };

        if self.revoked_sessions.contains(&claims.session_id) {
            return Ok(None);
        }

        let Ok(user_id) = claims.sub.parse::<Uuid>() else {
            return Ok(None);
        };
        let Some(expires_at) = DateTime::from_timestamp(claims.exp, 0) else {
            return Ok(None);
        };

        Ok(Some(Session {
            user_id,
            email: claims.email,
            expires_at,
            metadata: claims.user_metadata,
        }))
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<SessionTokens, AppError> {
        let (_, pending) = self
            .pending_logins
            .remove(auth_code)
            .ok_or_else(|| AppError::BadRequest("invalid_grant".to_string()))?;

        if pending.code_verifier != code_verifier {
            return Err(AppError::BadRequest("code verifier mismatch".to_string()));
        }

        self.issue_session(&pending.user, Duration::hours(1))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        if let Some(claims) = self.decode_claims(access_token) {
            self.revoked_sessions.insert(claims.session_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryDb {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.get(&user_id).map(|p| p.value().clone()))
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<Profile, AppError> {
        self.check_writable()?;

        match self.profiles.entry(profile.user_id) {
            Entry::Occupied(_) => Err(AppError::StorageConflict(format!(
                "profiles.user_id {} already exists",
                profile.user_id
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let row = Profile {
                    id: Uuid::new_v4(),
                    user_id: profile.user_id,
                    email: profile.email.clone(),
                    full_name: profile.full_name.clone(),
                    avatar_url: profile.avatar_url.clone(),
                    bio: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, AppError> {
        self.check_writable()?;

        Ok(self.profiles.get_mut(&user_id).map(|mut profile| {
            update.apply(&mut profile, Utc::now());
            profile.clone()
        }))
    }
}

#[async_trait]
impl TokenStore for MemoryDb {
    async fn get_token(
        &self,
        user_id: Uuid,
        provider: CalendarProvider,
    ) -> Result<Option<OAuthToken>, AppError> {
        Ok(self.tokens.get(&(user_id, provider)).map(|t| t.value().clone()))
    }

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError> {
        self.check_writable()?;
        self.tokens
            .insert((token.user_id, token.provider), token.clone());
        Ok(())
    }
}

#[async_trait]
impl TutorialStore for MemoryDb {
    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, AppError> {
        if self.tutorials_offline.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "relation \"public.tutorials\" does not exist".to_string(),
            ));
        }

        let mut rows: Vec<Tutorial> = self
            .tutorials
            .iter()
            .map(|t| t.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl SchemaAdmin for MemoryDb {
    async fn execute_sql(&self, sql: &str) -> Result<(), AppError> {
        self.check_writable()?;
        self.executed_sql.lock().await.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> IdentityUser {
        IdentityUser {
            id: Uuid::new_v4(),
            email: Some("lin@example.com".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Lin".to_string()),
                avatar_url: None,
            },
        }
    }

    #[tokio::test]
    async fn test_issued_session_resolves() {
        let db = MemoryDb::new(b"secret");
        let user = user();
        let tokens = db.issue_session(&user, Duration::minutes(5)).unwrap();

        let session = db.get_user(&tokens.access_token).await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.email, "lin@example.com");
        assert_eq!(session.metadata.full_name.as_deref(), Some("Lin"));
    }

    #[tokio::test]
    async fn test_expired_and_foreign_tokens_rejected() {
        let db = MemoryDb::new(b"secret");
        let expired = db.issue_session(&user(), Duration::minutes(-5)).unwrap();
        assert!(db.get_user(&expired.access_token).await.unwrap().is_none());

        let other = MemoryDb::new(b"other-secret");
        let foreign = other.issue_session(&user(), Duration::minutes(5)).unwrap();
        assert!(db.get_user(&foreign.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let db = MemoryDb::new(b"secret");
        let tokens = db.issue_session(&user(), Duration::minutes(5)).unwrap();

        db.sign_out(&tokens.access_token).await.unwrap();
        assert!(db.get_user(&tokens.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_code_is_single_use() {
        let db = MemoryDb::new(b"secret");
        db.register_login_code("code-1", "verifier", user());

        assert!(db
            .exchange_code_for_session("code-1", "wrong")
            .await
            .is_err());
        // A failed attempt still consumes the code.
        assert!(db
            .exchange_code_for_session("code-1", "verifier")
            .await
            .is_err());

        db.register_login_code("code-2", "verifier", user());
        let tokens = db
            .exchange_code_for_session("code-2", "verifier")
            .await
            .unwrap();
        assert!(db.get_user(&tokens.access_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_profile_insert_conflicts() {
        let db = MemoryDb::new(b"secret");
        let new = NewProfile {
            user_id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            full_name: "a".to_string(),
            avatar_url: String::new(),
        };

        db.insert_profile(&new).await.unwrap();
        let second = db.insert_profile(&new).await;
        assert!(matches!(second, Err(AppError::StorageConflict(_))));
        assert_eq!(db.profile_count(), 1);
    }
}
