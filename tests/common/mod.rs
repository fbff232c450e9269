// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use chrono::Duration;
use learn_together::config::Config;
use learn_together::db::{Backend, MemoryDb};
use learn_together::middleware::session::encode_session_cookie;
use learn_together::models::{IdentityUser, UserMetadata};
use learn_together::routes::create_router;
use learn_together::AppState;
use std::sync::Arc;
use uuid::Uuid;

/// Router plus handles on its state and in-memory backend.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
}

/// Create a test app backed by `MemoryDb` with default test config.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let db = Arc::new(MemoryDb::new(&config.session_jwt_secret));
    let backend: Arc<dyn Backend> = db.clone();
    let state = Arc::new(AppState::new(config, backend).unwrap());

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
    }
}

#[allow(dead_code)]
pub fn test_user(email: &str) -> IdentityUser {
    IdentityUser {
        id: Uuid::new_v4(),
        email: Some(email.to_string()),
        user_metadata: UserMetadata::default(),
    }
}

/// `Cookie` header value carrying a fresh session for `user`.
#[allow(dead_code)]
pub fn session_cookie(app: &TestApp, user: &IdentityUser) -> String {
    session_cookie_with_ttl(app, user, Duration::hours(1))
}

#[allow(dead_code)]
pub fn session_cookie_with_ttl(app: &TestApp, user: &IdentityUser, ttl: Duration) -> String {
    let tokens = app.db.issue_session(user, ttl).unwrap();
    format!(
        "{}={}",
        app.state.config.session_cookie_name,
        encode_session_cookie(&tokens).unwrap()
    )
}

#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}
