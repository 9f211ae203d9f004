// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/users")
                .body(Body::from(
                    json!({ "email": "a@example.com", "password": "secret1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_field_type_is_unprocessable() {
    let (app, _) = common::create_test_app();
    let alice = common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        &format!("/api/v1/users/{}/accounts", alice.id),
        Some(&alice.access_token),
        Some(json!({
            "account_name": "Wallet",
            "account_type": "cash",
            "currency": "KES",
            "balance": "lots",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unprocessable_entity");
}

#[tokio::test]
async fn test_registration_field_failures() {
    let (app, _) = common::create_test_app();

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/v1/users",
        None,
        Some(json!({ "email": "not-an-email", "password": "abc" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_failed");
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["failed_field"], "email");
    assert_eq!(failures[0]["tag"], "email");
    assert_eq!(failures[1]["failed_field"], "password");
    assert_eq!(failures[1]["tag"], "length");
    assert_eq!(failures[1]["value"], "max=55,min=6");
}

#[tokio::test]
async fn test_blank_fields_are_required() {
    let (app, _) = common::create_test_app();
    let alice = common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        &format!("/api/v1/users/{}/merchants", alice.id),
        Some(&alice.access_token),
        Some(json!({ "name": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["failures"][0]["failed_field"], "name");
    assert_eq!(body["failures"][0]["tag"], "required");
    assert_eq!(body["failures"][0]["value"], "field is empty");
}

#[tokio::test]
async fn test_login_requires_device() {
    let (app, _) = common::create_test_app();
    common::signup(&app, "alice@example.com").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": common::PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["failures"][0]["failed_field"], "device_id");
}

#[tokio::test]
async fn test_invalid_resource_id_is_bad_request() {
    let (app, _) = common::create_test_app();
    let alice = common::signup(&app, "alice@example.com").await;

    let (status, _) = common::send(
        &app,
        Method::GET,
        &format!("/api/v1/users/{}/accounts/not-a-uuid", alice.id),
        Some(&alice.access_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_error_body_shape() {
    let (app, _) = common::create_test_app();

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({
            "email": "ghost@example.com",
            "password": common::PASSWORD,
            "device_id": common::DEVICE,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "not_found");
    assert!(body["time"].as_str().unwrap().ends_with('Z'));
    assert!(body.get("failures").is_none());
}
