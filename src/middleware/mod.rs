// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (sessions, route guard, security, etc.).

pub mod admin;
pub mod guard;
pub mod security;
pub mod session;

pub use admin::require_admin_token;
pub use guard::route_guard;
pub use session::{require_session, resolve_session, SessionContext};
