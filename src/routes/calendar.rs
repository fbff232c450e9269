// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event proxy route.

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Session;
use crate::routes::parse_json_body;
use crate::services::calendar::{CreateEventRequest, ListEventsRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/calendar/events", post(events))
}

/// A body with both `timeMin` and `timeMax` lists events; anything else
/// creates one.
pub fn is_list_request(body: &Value) -> bool {
    let present = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    present("timeMin") && present("timeMax")
}

async fn events(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    body: Bytes,
) -> Result<Response> {
    let body: Value = parse_json_body(&body)?;

    let result = if is_list_request(&body) {
        let request: ListEventsRequest = serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        state
            .calendar
            .list_events(&session, &request)
            .await
            .map(|events| json!({ "events": events }))
    } else {
        let request: CreateEventRequest = serde_json::from_value(body)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        state
            .calendar
            .create_event(&session, request)
            .await
            .map(|event| json!({ "event": event }))
    };

    result.map(|body| Json(body).into_response()).inspect_err(|e| {
        if e.is_provider_error() {
            tracing::warn!(user_id = %session.user_id, "Calendar provider call failed for user");
        }
    })
}
