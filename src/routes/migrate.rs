// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Schema migration route.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::db::migrations::run_migrations;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/migrate", get(migrate))
}

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub success: bool,
    pub message: String,
}

async fn migrate(State(state): State<Arc<AppState>>) -> (StatusCode, Json<MigrateResponse>) {
    match run_migrations(state.backend.as_ref()).await {
        Ok(steps) => (
            StatusCode::OK,
            Json(MigrateResponse {
                success: true,
                message: format!("Database schema initialized ({} steps)", steps),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Migration failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MigrateResponse {
                    success: false,
                    message: e.to_string(),
                }),
            )
        }
    }
}
