// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and token refresh.
//!
//! A session row holds the current refresh token for each (user, device).
//! Login and refresh both rotate it, so an older refresh token for the same
//! device stops working as soon as a new pair is issued.

use super::extract::{normalized_email, not_blank, ValidatedJson};
use super::users::USER_NOT_FOUND;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Session, User};
use crate::services::{verify_password_blocking, within_refresh_window, TokenError, TokenPair};
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// `POST /login`, open to anyone.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}

/// `POST /refresh`, for any authenticated user.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/refresh", post(refresh))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "normalized_email")]
    #[validate(custom(function = "not_blank"), email, length(max = 155))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, max = 55))]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub device_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub refresh_token: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub device_id: String,
}

/// Tokens plus the user they were issued to.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: TokenPair,
    pub user: User,
}

async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    if !verify_password_blocking(req.password, user.password_hash.clone()).await {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized("incorrect password".to_string()));
    }

    let token = start_session(&state, &user, &req.device_id).await?;
    tracing::info!(user_id = %user.id, device_id = %req.device_id, "User logged in");
    Ok(Json(TokenResponse { token, user }))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    let now = Utc::now().timestamp();
    if !within_refresh_window(&auth.claims, now) {
        return Err(AppError::BadRequest("access token not expired".to_string()));
    }

    let claims = state
        .tokens
        .verify_refresh_token(&req.refresh_token)
        .map_err(|e| match e {
            TokenError::Expired => {
                AppError::Unauthorized("token is expired login required".to_string())
            }
            _ => AppError::InvalidToken,
        })?;
    if claims.sub != auth.user_id {
        return Err(AppError::Unauthorized(
            "refresh token does not belong to user".to_string(),
        ));
    }

    state
        .db
        .get_session(claims.sub, &req.device_id, &req.refresh_token, now)
        .await?
        .ok_or_else(|| AppError::NotFound("session not found".to_string()))?;

    let user = state
        .db
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    let token = start_session(&state, &user, &req.device_id).await?;
    tracing::info!(user_id = %user.id, device_id = %req.device_id, "Tokens refreshed");
    Ok(Json(TokenResponse { token, user }))
}

/// Issue a token pair and make its refresh token the device's current one.
async fn start_session(state: &AppState, user: &User, device_id: &str) -> Result<TokenPair> {
    let pair = state
        .tokens
        .issue_pair(
            user.id,
            state.config.token_duration,
            state.config.refresh_token_duration,
        )
        .map_err(|e| AppError::Internal(e.into()))?;

    state
        .db
        .save_session(Session {
            user_id: user.id,
            device_id: device_id.to_string(),
            refresh_token: pair.refresh_token.clone(),
            expires_at: pair.refresh_token_expires_at,
            created_at: Utc::now(),
        })
        .await?;

    Ok(pair)
}
