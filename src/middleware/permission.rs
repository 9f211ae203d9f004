// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role-based authorization.
//!
//! Each protected route group carries a list of [`Permission`]s; a request is
//! allowed when any one of them passes. Runs after [`require_auth`], which
//! supplies the [`AuthUser`].
//!
//! [`require_auth`]: super::auth::require_auth

use super::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
    RequestExt,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Anyone, authenticated or not
    Prospect,
    /// Any authenticated user
    Member,
    /// Authenticated user acting on their own `{user_id}`
    MemberIsTarget,
    /// Authenticated user holding the `admin` role
    Admin,
}

pub const PROSPECT: &[Permission] = &[Permission::Prospect];
pub const MEMBER: &[Permission] = &[Permission::Member];
pub const OWNER: &[Permission] = &[Permission::MemberIsTarget];
pub const OWNER_OR_ADMIN: &[Permission] = &[Permission::MemberIsTarget, Permission::Admin];
pub const ADMIN: &[Permission] = &[Permission::Admin];

/// Middleware state: the app plus the permissions a route group requires.
#[derive(Clone)]
pub struct Guard {
    pub state: Arc<AppState>,
    pub permissions: &'static [Permission],
}

impl Guard {
    pub fn new(state: Arc<AppState>, permissions: &'static [Permission]) -> Self {
        Self { state, permissions }
    }
}

/// Path segment compared against the token subject for `MemberIsTarget`.
const TARGET_PARAM: &str = "user_id";

pub async fn authorize(
    State(guard): State<Guard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = request.extensions().get::<AuthUser>().cloned();
    let target = match request.extract_parts::<RawPathParams>().await {
        Ok(params) => params
            .iter()
            .find(|(key, _)| *key == TARGET_PARAM)
            .and_then(|(_, value)| Uuid::parse_str(value).ok()),
        Err(_) => None,
    };

    for permission in guard.permissions {
        if check(&guard.state, *permission, auth.as_ref(), target).await? {
            return Ok(next.run(request).await);
        }
    }

    tracing::debug!(
        user_id = ?auth.as_ref().map(|a| a.user_id),
        path = %request.uri().path(),
        "Permission denied"
    );
    Err(AppError::Forbidden("permission denied".to_string()))
}

async fn check(
    state: &AppState,
    permission: Permission,
    auth: Option<&AuthUser>,
    target: Option<Uuid>,
) -> Result<bool, AppError> {
    let Some(auth) = auth else {
        return Ok(permission == Permission::Prospect);
    };

    Ok(match permission {
        Permission::Prospect | Permission::Member => true,
        Permission::MemberIsTarget => {
            target == Some(auth.user_id) && is_live(state, auth.user_id).await?
        }
        Permission::Admin => {
            state
                .role_cache
                .roles(&state.db, auth.user_id)
                .await?
                .iter()
                .any(|role| role.is_admin())
                && is_live(state, auth.user_id).await?
        }
    })
}

/// Tokens outlive their user; a deleted user's token grants nothing beyond `Member`.
async fn is_live(state: &AppState, user_id: Uuid) -> Result<bool, AppError> {
    Ok(state.db.get_user(user_id).await?.is_some())
}
