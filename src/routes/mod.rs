// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod accounts;
pub mod categories;
pub mod extract;
pub mod merchants;
pub mod roles;
pub mod tokens;
pub mod transactions;
pub mod users;

use crate::error::{AppError, Result};
use crate::middleware::permission::{self, Permission};
use crate::middleware::{authorize, require_auth, Guard};
use crate::time_utils::format_ansic;
use crate::AppState;
use axum::extract::State;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
}

/// `{"message": ...}` body for deletes and revocations.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

async fn version(State(state): State<Arc<AppState>>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.config.build_version.clone(),
    })
}

/// Deletion confirmation naming the resource and when it was deleted.
pub(crate) fn deleted(resource: &str, at: DateTime<Utc>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("{} successfully deleted at {}", resource, format_ansic(at)),
    })
}

/// Empty list results are reported as not found.
pub(crate) fn non_empty<T>(rows: Vec<T>, message: &str) -> Result<Vec<T>> {
    if rows.is_empty() {
        return Err(AppError::NotFound(message.to_string()));
    }
    Ok(rows)
}

/// Apply a permission check to every route in `router`.
fn guarded(
    router: Router<Arc<AppState>>,
    state: &Arc<AppState>,
    permissions: &'static [Permission],
) -> Router<Arc<AppState>> {
    router.route_layer(middleware::from_fn_with_state(
        Guard::new(state.clone(), permissions),
        authorize,
    ))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Registration and login (no token required)
    let public_routes = guarded(
        Router::new()
            .merge(users::public_routes())
            .merge(tokens::public_routes()),
        &state,
        permission::PROSPECT,
    );

    // Token required; each group then checks its own permissions
    let protected_routes = Router::new()
        .merge(guarded(tokens::routes(), &state, permission::MEMBER))
        .merge(guarded(users::routes(), &state, permission::OWNER_OR_ADMIN))
        .merge(guarded(
            Router::new()
                .merge(accounts::routes())
                .merge(categories::routes())
                .merge(merchants::routes())
                .merge(transactions::routes()),
            &state,
            permission::OWNER,
        ))
        .merge(guarded(
            Router::new()
                .merge(users::admin_routes())
                .merge(roles::routes()),
            &state,
            permission::ADMIN,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deleted_message_uses_ansic_time() {
        let at = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        let Json(body) = deleted("account", at);
        assert_eq!(
            body.message,
            "account successfully deleted at Mon Jan  2 15:04:05 2006"
        );
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty(vec![1], "none").is_ok());
        assert!(matches!(
            non_empty(Vec::<i32>::new(), "none"),
            Err(AppError::NotFound(msg)) if msg == "none"
        ));
    }
}
