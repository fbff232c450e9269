// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile bootstrapping and profile API tests.

use axum::http::StatusCode;
use learn_together::db::ProfileStore;
use learn_together::models::UserMetadata;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_first_request_creates_default_profile() {
    let app = common::create_test_app();
    let user = common::test_user("grace.hopper@example.com");
    let cookie = common::session_cookie(&app, &user);

    let response = app
        .router
        .oneshot(common::get("/api/profile", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["full_name"], "grace.hopper");
    assert_eq!(body["avatar_url"], "");
    assert_eq!(body["email"], "grace.hopper@example.com");
    assert_eq!(app.db.profile_count(), 1);
}

#[tokio::test]
async fn test_metadata_name_and_avatar_used() {
    let app = common::create_test_app();
    let mut user = common::test_user("gh@example.com");
    user.user_metadata = UserMetadata {
        full_name: Some("Grace Hopper".to_string()),
        avatar_url: Some("https://example.com/gh.png".to_string()),
    };
    let cookie = common::session_cookie(&app, &user);

    let response = app
        .router
        .oneshot(common::get("/api/profile", Some(&cookie)))
        .await
        .unwrap();

    let body = common::body_json(response).await;
    assert_eq!(body["full_name"], "Grace Hopper");
    assert_eq!(body["avatar_url"], "https://example.com/gh.png");
}

#[tokio::test]
async fn test_existing_profile_returned_unchanged() {
    let app = common::create_test_app();
    let user = common::test_user("lin@example.com");
    let cookie = common::session_cookie(&app, &user);

    let first = common::body_json(
        app.router
            .clone()
            .oneshot(common::get("/api/profile", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    let second = common::body_json(
        app.router
            .clone()
            .oneshot(common::get("/api/profile", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first, second);
    assert_eq!(app.db.profile_count(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_create_one_profile() {
    let app = common::create_test_app();
    let user = common::test_user("race@example.com");
    let cookie = common::session_cookie(&app, &user);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let router = app.router.clone();
        let cookie = cookie.clone();
        tasks.push(tokio::spawn(async move {
            let response = router
                .oneshot(common::get("/api/profile", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            common::body_json(response).await["id"].clone()
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }

    assert_eq!(app.db.profile_count(), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test]
async fn test_storage_failure_on_bootstrap_is_500() {
    let app = common::create_test_app();
    app.db.set_read_only(true);
    let user = common::test_user("ro@example.com");
    let cookie = common::session_cookie(&app, &user);

    let response = app
        .router
        .oneshot(common::get("/api/profile", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "database_error");
}

#[tokio::test]
async fn test_update_profile() {
    let app = common::create_test_app();
    let user = common::test_user("edit@example.com");
    let cookie = common::session_cookie(&app, &user);

    let response = app
        .router
        .clone()
        .oneshot(common::json_request(
            "PATCH",
            "/api/profile",
            Some(&cookie),
            json!({"full_name": "Edith", "bio": "Teaches chess"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["full_name"], "Edith");
    assert_eq!(body["bio"], "Teaches chess");

    let stored = app.db.get_profile(user.id).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Edith");
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn test_update_profile_rejects_invalid_input() {
    let app = common::create_test_app();
    let user = common::test_user("bad@example.com");
    let cookie = common::session_cookie(&app, &user);

    for body in [
        json!({"avatar_url": "javascript:alert(1)"}).to_string(),
        json!({"full_name": ""}).to_string(),
        "{not json".to_string(),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(common::json_request("PATCH", "/api/profile", Some(&cookie), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let stored = app.db.get_profile(user.id).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "bad");
}
