// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod profile;
pub mod session;
pub mod token;
pub mod tutorial;

pub use profile::{NewProfile, Profile, ProfileUpdate};
pub use session::{IdentityUser, Session, SessionTokens, UserMetadata};
pub use token::{CalendarProvider, OAuthToken};
pub use tutorial::Tutorial;
