// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without a usable bearer token
//! 2. Login checks credentials
//! 3. CORS preflight and security headers are applied

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn status_with_header(app: &axum::Router, uri: &str, authorization: &str) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, authorization)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = common::create_test_app();
    let user = common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}", user.id),
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["details"], "authorization header not provided");
}

#[tokio::test]
async fn test_malformed_authorization_headers() {
    let (app, _) = common::create_test_app();
    let user = common::signup(&app, "alice@example.com").await;
    let uri = format!("/api/v1/users/{}", user.id);

    assert_eq!(
        status_with_header(&app, &uri, "Bearer").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_with_header(&app, &uri, &format!("Basic {}", user.access_token)).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_with_header(&app, &uri, "Bearer not.a.jwt").await,
        StatusCode::UNAUTHORIZED
    );
    // Scheme is case-insensitive
    assert_eq!(
        status_with_header(&app, &uri, &format!("bearer {}", user.access_token)).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let (app, state) = common::create_test_app();
    let user = common::signup(&app, "alice@example.com").await;
    let expired = common::access_token(&state, user.id, -10);

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}", user.id),
        Some(&expired),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "expired_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
        iat: i64,
    }

    let (app, _) = common::create_test_app();
    let user = common::signup(&app, "alice@example.com").await;

    let now = chrono::Utc::now().timestamp();
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: user.id.to_string(),
            exp: now + 600,
            iat: now,
        },
        &EncodingKey::from_secret(b"some_other_key_that_is_32_bytes!!"),
    )
    .unwrap();

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}", user.id),
        Some(&forged),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (app, _) = common::create_test_app();
    let user = common::signup(&app, "alice@example.com").await;

    let (status, _) = common::send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}", user.id),
        Some(&user.refresh_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_checks_credentials() {
    let (app, _) = common::create_test_app();
    common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({
            "email": "alice@example.com",
            "password": "wrong-password",
            "device_id": common::DEVICE,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"], "incorrect password");

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({
            "email": "nobody@example.com",
            "password": common::PASSWORD,
            "device_id": common::DEVICE,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let (app, _) = common::create_test_app();
    common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({
            "email": "Alice@Example.COM",
            "password": common::PASSWORD,
            "device_id": common::DEVICE,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"]["access_token_expires_at"].is_i64());
}

#[tokio::test]
async fn test_cors_preflight_from_frontend() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/users")
                .header(header::ORIGIN, state.config.frontend_url.as_str())
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        state.config.frontend_url.as_str()
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/users")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}
