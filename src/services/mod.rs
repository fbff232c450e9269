// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod google_oauth;
pub mod profile;

pub use calendar::{CalendarService, GoogleCalendarClient};
pub use google_oauth::{GoogleOAuthClient, TokenGrant};
pub use profile::ProfileService;
