// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role administration. Every route here is admin-only.

use super::extract::{not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery};
use super::users::USER_NOT_FOUND;
use super::{non_empty, MessageResponse};
use crate::db::messages::ROLE_NOT_HELD;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Role, User, UserRole};
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Extension, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{user_id}/role",
            get(get_role).post(grant_role).delete(revoke_role),
        )
        .route("/users/{user_id}/roles", get(list_roles))
        .route("/roles/{role}/users", get(list_role_users))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RoleRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 32))]
    pub role: String,
}

impl RoleRequest {
    fn role(&self) -> Result<Role> {
        parse_role(&self.role)
    }
}

fn parse_role(raw: &str) -> Result<Role> {
    Role::parse(raw).ok_or_else(|| {
        AppError::BadRequest("role must be lowercase letters and digits".to_string())
    })
}

async fn require_user(state: &AppState, user_id: Uuid) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
}

async fn grant_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> Result<(StatusCode, Json<UserRole>)> {
    let role = req.role()?;
    require_user(&state, user_id).await?;

    let granted = state.db.grant_role(user_id, &role).await?;
    state.role_cache.invalidate(user_id);

    tracing::info!(user_id = %user_id, role = %role, granted_by = %auth.user_id, "Role granted");
    Ok((StatusCode::CREATED, Json(granted)))
}

async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> Result<Json<MessageResponse>> {
    let role = req.role()?;
    state.db.revoke_role(user_id, &role).await?;
    state.role_cache.invalidate(user_id);

    tracing::info!(user_id = %user_id, role = %role, revoked_by = %auth.user_id, "Role revoked");
    Ok(Json(MessageResponse {
        message: "role revoked successfully".to_string(),
    }))
}

/// The user's earliest-granted role.
async fn get_role(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
) -> Result<Json<UserRole>> {
    let page = crate::db::Page {
        limit: 1,
        offset: 0,
    };
    let role = state
        .db
        .list_roles(user_id, page)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(ROLE_NOT_HELD.to_string()))?;
    Ok(Json(role))
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<UserRole>>> {
    let roles = state.db.list_roles(user_id, query.page()).await?;
    Ok(Json(non_empty(roles, "role(s) not found")?))
}

async fn list_role_users(
    State(state): State<Arc<AppState>>,
    ResourcePath(role): ResourcePath<String>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<User>>> {
    let role = parse_role(&role)?;
    let users = state.db.list_users_with_role(&role, query.page()).await?;
    Ok(Json(non_empty(users, "user(s) not found or deleted")?))
}
