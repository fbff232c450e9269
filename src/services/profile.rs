// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile bootstrapping and updates.

use crate::db::Backend;
use crate::error::AppError;
use crate::models::{NewProfile, Profile, ProfileUpdate, Session};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the application profile for a user on first use.
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn Backend>,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Return the caller's profile, creating a default one if none exists.
    ///
    /// Concurrent first requests for the same user race on the `user_id`
    /// uniqueness constraint; the losers re-read the winner's row.
    pub async fn ensure_profile(&self, session: &Session) -> Result<Profile, AppError> {
        if let Some(profile) = self.backend.get_profile(session.user_id).await? {
            return Ok(profile);
        }

        let new_profile = default_profile(session);

        match self.backend.insert_profile(&new_profile).await {
            Ok(profile) => {
                tracing::info!(user_id = %session.user_id, "Created profile");
                Ok(profile)
            }
            Err(AppError::StorageConflict(detail)) => {
                tracing::debug!(
                    user_id = %session.user_id,
                    detail = %detail,
                    "Profile created concurrently, re-reading"
                );
                self.backend
                    .get_profile(session.user_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database(format!(
                            "Profile for {} conflicted on insert but is not readable",
                            session.user_id
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a validated partial update to the caller's profile.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, AppError> {
        update
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if update.is_empty() {
            return self
                .backend
                .get_profile(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Profile for {}", user_id)));
        }

        self.backend
            .update_profile(user_id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for {}", user_id)))
    }
}

/// Default profile for a session: display name from identity metadata,
/// falling back to the local part of the email.
pub fn default_profile(session: &Session) -> NewProfile {
    let full_name = session
        .metadata
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email_local_part(&session.email).to_string());

    NewProfile {
        user_id: session.user_id,
        email: session.email.clone(),
        full_name,
        avatar_url: session.metadata.avatar_url.clone().unwrap_or_default(),
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}
