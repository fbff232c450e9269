// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile API and dashboard data.

use axum::{body::Bytes, extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Profile, ProfileUpdate, Session};
use crate::routes::parse_json_body;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route("/dashboard", get(dashboard))
}

/// Dashboard payload.
#[derive(Serialize)]
pub struct DashboardResponse {
    pub profile: Profile,
    pub calendar_connected: bool,
}

async fn get_profile(Extension(profile): Extension<Profile>) -> Json<Profile> {
    Json(profile)
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    body: Bytes,
) -> Result<Json<Profile>> {
    let update: ProfileUpdate = parse_json_body(&body)?;
    let profile = state.profiles.update_profile(session.user_id, &update).await?;

    tracing::info!(user_id = %session.user_id, "Profile updated");
    Ok(Json(profile))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<DashboardResponse>> {
    let calendar_connected = state.calendar.is_connected(profile.user_id).await?;
    Ok(Json(DashboardResponse {
        profile,
        calendar_connected,
    }))
}
