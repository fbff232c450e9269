// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public tutorial listing.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::models::Tutorial;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/tutorials", get(list_tutorials))
}

#[derive(Serialize)]
pub struct TutorialsResponse {
    pub tutorials: Vec<Tutorial>,
}

/// Newest first. A storage failure is logged and yields an empty list.
async fn list_tutorials(State(state): State<Arc<AppState>>) -> Json<TutorialsResponse> {
    let tutorials = match state.backend.list_tutorials().await {
        Ok(tutorials) => tutorials,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch tutorials");
            Vec::new()
        }
    };

    Json(TutorialsResponse { tutorials })
}
