// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token authentication middleware.

use crate::error::AppError;
use crate::services::{AccessClaims, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: AccessClaims,
}

/// Middleware that requires a valid access token in the `Authorization` header.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(
        request
            .headers()
            .get(header::AUTHORIZATION)
            .map(|h| h.to_str().unwrap_or_default()),
    )?;

    let claims = state
        .tokens
        .verify_access_token(token)
        .map_err(|e| match e {
            TokenError::Expired => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        })?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        claims,
    });

    Ok(next.run(request).await)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header
        .ok_or_else(|| AppError::Unauthorized("authorization header not provided".to_string()))?;

    let mut fields = header.split_whitespace();
    let (Some(scheme), Some(token)) = (fields.next(), fields.next()) else {
        return Err(AppError::Unauthorized(
            "invalid authorization header format".to_string(),
        ));
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized(
            "authorization type is not supported".to_string(),
        ));
    }

    Ok(token)
}
