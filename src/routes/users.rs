// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User registration and profile management.

use super::extract::{
    normalized_email, not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery,
};
use super::{deleted, non_empty, MessageResponse};
use crate::db::NewUser;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Role, User};
use crate::services::{hash_password_blocking, verify_password_blocking};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub(crate) const USER_NOT_FOUND: &str = "user does not exist";

/// `POST /users`, open to anyone.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/users", post(create_user))
}

/// Routes on a single user, for that user or an admin.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/users/{user_id}",
        get(get_user).put(change_password).delete(delete_user),
    )
}

/// Admin-only listing.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/users", get(list_users))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default, deserialize_with = "normalized_email")]
    #[validate(custom(function = "not_blank"), email, length(max = 155))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, max = 55))]
    pub password: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let password_hash = hash_password_blocking(req.password)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let user = state
        .db
        .create_user(NewUser {
            email: req.email,
            password_hash,
        })
        .await?;

    if state.config.admin_email.as_deref() == Some(user.email.as_str()) {
        state.db.grant_role(user.id, &Role::admin()).await?;
        state.role_cache.invalidate(user.id);
        tracing::info!(user_id = %user.id, "Bootstrap admin registered");
    }

    tracing::info!(user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
) -> Result<Json<User>> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    Ok(Json(user))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<User>>> {
    let users = state.db.list_users(query.page()).await?;
    Ok(Json(non_empty(users, "user(s) not found or deleted")?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Required when users change their own password
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    #[validate(length(min = 6, max = 55))]
    pub new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<User>> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    // Admins may reset other users' passwords without knowing the old one.
    if auth.user_id == user_id {
        let old = req.old_password.unwrap_or_default();
        if !verify_password_blocking(old, user.password_hash).await {
            return Err(AppError::Unauthorized("incorrect password".to_string()));
        }
    }

    let password_hash = hash_password_blocking(req.new_password)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    let user = state
        .db
        .update_password(user_id, &password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, changed_by = %auth.user_id, "Password changed");
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ResourcePath(user_id): ResourcePath<Uuid>,
) -> Result<Json<MessageResponse>> {
    let deleted_at = state
        .db
        .delete_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    state.role_cache.invalidate(user_id);

    tracing::info!(user_id = %user_id, deleted_by = %auth.user_id, "User deleted");
    Ok(deleted("user", deleted_at))
}
