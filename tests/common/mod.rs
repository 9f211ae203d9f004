// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use ledger_api::config::Config;
use ledger_api::db::Database;
use ledger_api::routes::create_router;
use ledger_api::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

#[allow(dead_code)]
pub const PASSWORD: &str = "secret123";
#[allow(dead_code)]
pub const DEVICE: &str = "test-device";

/// Check if a Postgres database is available via environment variable.
#[allow(dead_code)]
pub fn database_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

/// Connect to the Postgres database named by `DATABASE_URL`.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    let mut config = Config::test_default();
    config.database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    Database::connect(&config)
        .await
        .expect("Failed to connect to Postgres")
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(Config::test_default(), Database::in_memory())
            .expect("Failed to build app state"),
    );
    (create_router(state.clone()), state)
}

/// Send a request and decode the JSON response body (`Null` when empty).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// A registered, logged-in user.
#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Register `email` and log in from [`DEVICE`].
#[allow(dead_code)]
pub async fn signup(app: &Router, email: &str) -> TestUser {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/v1/users",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {}", email);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD, "device_id": DEVICE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login {}", email);

    TestUser {
        id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        email: email.to_string(),
        access_token: body["token"]["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["token"]["refresh_token"].as_str().unwrap().to_string(),
    }
}

/// Register the configured admin email and log in.
#[allow(dead_code)]
pub async fn signup_admin(app: &Router, state: &AppState) -> TestUser {
    let email = state.config.admin_email.clone().unwrap();
    signup(app, &email).await
}

/// Mint an access token for `user_id` that expires after `seconds`.
#[allow(dead_code)]
pub fn access_token(state: &AppState, user_id: Uuid, seconds: i64) -> String {
    state
        .tokens
        .create_access_token(user_id, chrono::Duration::seconds(seconds))
        .unwrap()
        .0
}

/// Create an account, category and merchant for `user`, returning their ids.
#[allow(dead_code)]
pub async fn seed_ledger(app: &Router, user: &TestUser) -> (String, String, String) {
    let token = Some(user.access_token.as_str());

    let (status, account) = send(
        app,
        Method::POST,
        &format!("/api/v1/users/{}/accounts", user.id),
        token,
        Some(json!({ "account_name": "Wallet", "account_type": "cash", "currency": "KES" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, category) = send(
        app,
        Method::POST,
        &format!("/api/v1/users/{}/categories", user.id),
        token,
        Some(json!({ "name": "Food" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, merchant) = send(
        app,
        Method::POST,
        &format!("/api/v1/users/{}/merchants", user.id),
        token,
        Some(json!({ "name": "Grocer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        account["account_id"].as_str().unwrap().to_string(),
        category["id"].as_str().unwrap().to_string(),
        merchant["id"].as_str().unwrap().to_string(),
    )
}
