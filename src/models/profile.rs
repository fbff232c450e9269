// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application-level profile model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Profile row stored in the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Auth user ID (unique)
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a profile; ID and timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_avatar_url"))]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.avatar_url.is_none() && self.bio.is_none()
    }

    /// Apply this update to a profile in place.
    pub fn apply(&self, profile: &mut Profile, now: DateTime<Utc>) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = avatar_url.clone();
        }
        if let Some(bio) = &self.bio {
            profile.bio = Some(bio.clone());
        }
        profile.updated_at = now;
    }
}

/// Empty clears the avatar; anything else must be an http(s) URL.
fn validate_avatar_url(url: &str) -> Result<(), validator::ValidationError> {
    if url.is_empty() || url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("avatar_url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_validation() {
        let ok = ProfileUpdate {
            full_name: Some("Grace Hopper".to_string()),
            avatar_url: Some(String::new()),
            bio: None,
        };
        assert!(ok.validate().is_ok());

        let empty_name = ProfileUpdate {
            full_name: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_name.validate().is_err());

        let bad_avatar = ProfileUpdate {
            avatar_url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        assert!(bad_avatar.validate().is_err());
    }

    #[test]
    fn test_profile_update_apply_keeps_absent_fields() {
        let created = Utc::now();
        let mut profile = Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "grace@example.com".to_string(),
            full_name: "grace".to_string(),
            avatar_url: String::new(),
            bio: None,
            created_at: created,
            updated_at: created,
        };

        let later = created + chrono::Duration::seconds(5);
        ProfileUpdate {
            bio: Some("COBOL".to_string()),
            ..Default::default()
        }
        .apply(&mut profile, later);

        assert_eq!(profile.full_name, "grace");
        assert_eq!(profile.bio.as_deref(), Some("COBOL"));
        assert_eq!(profile.created_at, created);
        assert_eq!(profile.updated_at, later);
    }
}
