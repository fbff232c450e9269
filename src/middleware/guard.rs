// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard: send anonymous visitors of private pages to the login page.

use crate::middleware::session::SessionContext;
use axum::{
    extract::Request,
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Path prefixes reachable without a session. API routes answer 401
/// themselves instead of redirecting.
pub const PUBLIC_PREFIXES: &[&str] = &[
    "/login",
    "/signup",
    "/auth/callback",
    "/auth/logout",
    "/api",
    "/health",
];

/// Whether `path` may be served without a session.
///
/// `/` is public only as an exact match; prefixes match whole path segments.
pub fn is_public_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    PUBLIC_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Login URL that returns the visitor to `uri` afterwards.
pub fn login_redirect(uri: &Uri) -> String {
    let target = match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    };
    format!("/login?redirectTo={}", urlencoding::encode(&target))
}

/// Global middleware; runs after session resolution.
pub async fn route_guard(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if is_public_path(path) {
        return next.run(request).await;
    }

    let has_session = request
        .extensions()
        .get::<SessionContext>()
        .is_some_and(|ctx| ctx.session.is_some());

    if has_session {
        return next.run(request).await;
    }

    let location = login_redirect(request.uri());
    tracing::debug!(path = %path, "Redirecting anonymous request to login");
    Redirect::to(&location).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        for path in [
            "/",
            "/login",
            "/login/reset",
            "/signup",
            "/auth/callback",
            "/auth/logout",
            "/api/calendar/events",
            "/api/auth/google/url",
            "/health",
        ] {
            assert!(is_public_path(path), "{} should be public", path);
        }
    }

    #[test]
    fn test_private_paths() {
        for path in ["/dashboard", "/profile", "/loginx", "/signups", "/healthz", "/apix"] {
            assert!(!is_public_path(path), "{} should be private", path);
        }
    }

    #[test]
    fn test_login_redirect_keeps_query() {
        let uri: Uri = "/dashboard?tab=skills&x=1".parse().unwrap();
        assert_eq!(
            login_redirect(&uri),
            "/login?redirectTo=%2Fdashboard%3Ftab%3Dskills%26x%3D1"
        );

        let uri: Uri = "/profile".parse().unwrap();
        assert_eq!(login_redirect(&uri), "/login?redirectTo=%2Fprofile");
    }
}
