// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tutorial listing and the authoring page guard.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use learn_together::models::Tutorial;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

mod common;

fn tutorial(title: &str, age_days: i64) -> Tutorial {
    Tutorial {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        content: None,
        user_id: None,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

#[tokio::test]
async fn test_list_is_public_and_newest_first() {
    let app = common::create_test_app();
    app.db.add_tutorial(tutorial("Old", 30));
    app.db.add_tutorial(tutorial("New", 1));
    app.db.add_tutorial(tutorial("Middle", 10));

    let response = app
        .router
        .oneshot(common::get("/api/tutorials", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let titles: Vec<&str> = body["tutorials"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["New", "Middle", "Old"]);
}

#[tokio::test]
async fn test_list_empty_without_rows() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::get("/api/tutorials", None))
        .await
        .unwrap();

    let body = common::body_json(response).await;
    assert_eq!(body, json!({ "tutorials": [] }));
}

#[tokio::test]
async fn test_storage_failure_yields_empty_list() {
    let app = common::create_test_app();
    app.db.add_tutorial(tutorial("Hidden", 1));
    app.db.set_tutorials_offline(true);

    let response = app
        .router
        .oneshot(common::get("/api/tutorials", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body, json!({ "tutorials": [] }));
}

#[tokio::test]
async fn test_new_tutorial_page_requires_login() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::get("/tutorials/new", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        common::location(&response),
        "/login?redirectTo=%2Ftutorials%2Fnew"
    );
}
