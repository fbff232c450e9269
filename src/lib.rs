// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Learn Together: server side of a skill-sharing community.
//!
//! This crate resolves sessions issued by the hosted auth backend, guards
//! private pages, bootstraps user profiles, connects Google Calendar via
//! OAuth and proxies calendar event calls.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;

use config::Config;
use db::Backend;
use error::AppError;
use services::{CalendarService, GoogleCalendarClient, GoogleOAuthClient, ProfileService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub profiles: ProfileService,
    pub google_oauth: GoogleOAuthClient,
    pub calendar: CalendarService,
}

impl AppState {
    /// Wire services around a backend.
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Result<Self, AppError> {
        let google_oauth = GoogleOAuthClient::new(&config)?;
        let calendar = CalendarService::new(
            backend.clone(),
            GoogleCalendarClient::new(&config.google_calendar_api_url)?,
        );

        Ok(Self {
            profiles: ProfileService::new(backend.clone()),
            google_oauth,
            calendar,
            backend,
            config,
        })
    }
}
