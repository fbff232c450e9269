// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend layer: auth verification, row storage and schema administration.
//!
//! The server only ever talks to a `dyn Backend`. `SupabaseDb` is the hosted
//! implementation; `MemoryDb` backs local development and tests.

pub mod memory;
pub mod migrations;
pub mod supabase;

pub use memory::MemoryDb;
pub use supabase::SupabaseDb;

use crate::error::AppError;
use crate::models::{
    CalendarProvider, NewProfile, OAuthToken, Profile, ProfileUpdate, Session, SessionTokens,
    Tutorial,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const CALENDAR_TOKENS: &str = "calendar_tokens";
    pub const TUTORIALS: &str = "tutorials";
}

/// Session verification and login flows owned by the auth backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Verify an access token. `Ok(None)` means the backend rejected it.
    async fn get_user(&self, access_token: &str) -> Result<Option<Session>, AppError>;

    /// Exchange a PKCE login code for a session.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<SessionTokens, AppError>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
}

/// Profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;

    /// Insert a profile. A duplicate `user_id` yields `AppError::StorageConflict`.
    async fn insert_profile(&self, profile: &NewProfile) -> Result<Profile, AppError>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, AppError>;
}

/// Calendar OAuth tokens, one row per (user, provider).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(
        &self,
        user_id: Uuid,
        provider: CalendarProvider,
    ) -> Result<Option<OAuthToken>, AppError>;

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError>;
}

/// Tutorial rows.
#[async_trait]
pub trait TutorialStore: Send + Sync {
    /// All tutorials, newest first.
    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, AppError>;
}

/// Elevated schema operations (service credentials).
#[async_trait]
pub trait SchemaAdmin: Send + Sync {
    async fn execute_sql(&self, sql: &str) -> Result<(), AppError>;
}

/// Everything the HTTP layer needs from the backend.
pub trait Backend:
    AuthBackend + ProfileStore + TokenStore + TutorialStore + SchemaAdmin
{
}

impl<T> Backend for T where
    T: AuthBackend + ProfileStore + TokenStore + TutorialStore + SchemaAdmin
{
}
