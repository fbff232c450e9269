// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Published tutorials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row in `tutorials`. Columns not named here are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutorial {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Author's auth user ID.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_columns_dropped() {
        let row: Tutorial = serde_json::from_value(serde_json::json!({
            "id": "7f1e2a8c-0000-4000-8000-000000000002",
            "title": "Scales in C",
            "created_at": "2026-03-01T12:00:00Z",
            "difficulty": "beginner",
        }))
        .unwrap();

        assert_eq!(row.title, "Scales in C");
        assert_eq!(row.description, None);
        let back = serde_json::to_value(&row).unwrap();
        assert!(back.get("difficulty").is_none());
    }
}
