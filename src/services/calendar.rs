// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar proxy.
//!
//! Forwards create/list event calls to the Calendar REST API using the
//! caller's stored access token. Tokens are never refreshed or rewritten here.

use crate::db::Backend;
use crate::error::AppError;
use crate::models::{CalendarProvider, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const PRIMARY_CALENDAR: &str = "primary";
const LIST_MAX_RESULTS: u32 = 10;

/// Body of a create-event request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date_time: String,
    pub end_date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

/// Body of a list-events request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsRequest {
    pub time_min: String,
    pub time_max: String,
}

/// Event resource as sent to Google.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInsert {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
}

impl From<CreateEventRequest> for EventInsert {
    fn from(req: CreateEventRequest) -> Self {
        let time_zone = req
            .time_zone
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(|| "UTC".to_string());

        Self {
            summary: req.summary,
            description: req.description,
            location: req.location,
            start: EventDateTime {
                date_time: req.start_date_time,
                time_zone: time_zone.clone(),
            },
            end: EventDateTime {
                date_time: req.end_date_time,
                time_zone,
            },
            attendees: req
                .attendees
                .map(|emails| emails.into_iter().map(|email| Attendee { email }).collect()),
            reminders: Reminders { use_default: true },
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

/// Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Insert an event into the primary calendar. Returns Google's event
    /// resource unchanged.
    pub async fn insert_event(
        &self,
        access_token: &str,
        event: &EventInsert,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url, PRIMARY_CALENDAR
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// List upcoming single events in `[time_min, time_max]`.
    pub async fn list_events(
        &self,
        access_token: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<Value>, AppError> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url, PRIMARY_CALENDAR
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_string()),
                ("timeMax", time_max.to_string()),
                ("maxResults", LIST_MAX_RESULTS.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(e.to_string()))?;

        let list: EventList = self.check_response_json(response).await?;
        Ok(list.items.unwrap_or_default())
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Unauthorized - stored token expired or revoked
            if status.as_u16() == 401 {
                tracing::warn!("Google Calendar rejected access token (401)");
                return Err(AppError::ProviderAuthExpired);
            }

            return Err(AppError::ProviderRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(format!("JSON parse error: {}", e)))
    }
}

/// Calendar operations on behalf of a session.
#[derive(Clone)]
pub struct CalendarService {
    backend: Arc<dyn Backend>,
    client: GoogleCalendarClient,
}

impl CalendarService {
    pub fn new(backend: Arc<dyn Backend>, client: GoogleCalendarClient) -> Self {
        Self { backend, client }
    }

    /// Whether the user has a stored Google token.
    pub async fn is_connected(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .backend
            .get_token(user_id, CalendarProvider::Google)
            .await?
            .is_some())
    }

    pub async fn create_event(
        &self,
        session: &Session,
        request: CreateEventRequest,
    ) -> Result<Value, AppError> {
        let access_token = self.access_token(session.user_id).await?;
        let event = EventInsert::from(request);

        let created = self.client.insert_event(&access_token, &event).await?;
        let event_id = created.get("id").and_then(|id| id.as_str()).unwrap_or("");
        tracing::info!(user_id = %session.user_id, event_id, "Created calendar event");
        Ok(created)
    }

    pub async fn list_events(
        &self,
        session: &Session,
        request: &ListEventsRequest,
    ) -> Result<Vec<Value>, AppError> {
        let access_token = self.access_token(session.user_id).await?;
        let events = self
            .client
            .list_events(&access_token, &request.time_min, &request.time_max)
            .await?;
        tracing::debug!(user_id = %session.user_id, count = events.len(), "Listed calendar events");
        Ok(events)
    }

    async fn access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.backend
            .get_token(user_id, CalendarProvider::Google)
            .await?
            .map(|token| token.access_token)
            .ok_or(AppError::ProviderNotConnected)
    }
}
