// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Financial accounts owned by a user.

use super::extract::{not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery};
use super::{deleted, non_empty, MessageResponse};
use crate::db::NewAccount;
use crate::error::{AppError, Result};
use crate::models::{Account, AccountType, Currency};
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub(crate) const ACCOUNT_NOT_FOUND: &str = "account(s) not found or deleted";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{user_id}/accounts",
            get(list_accounts).post(create_account),
        )
        .route(
            "/users/{user_id}/accounts/{account_id}",
            get(get_account).put(update_balance).delete(delete_account),
        )
        .route(
            "/users/{user_id}/accounts/{account_id}/balance",
            get(account_balance),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub account_name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    /// Opening balance in minor units
    #[serde(default)]
    pub balance: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBalanceRequest {
    pub balance: i64,
}

/// Balance view of a single account.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub currency: Currency,
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>)> {
    let account = state
        .db
        .create_account(NewAccount {
            user_id,
            account_name: req.account_name.trim().to_string(),
            account_type: req.account_type,
            balance: req.balance,
            currency: req.currency,
        })
        .await?;

    tracing::info!(user_id = %user_id, account_id = %account.account_id, "Account created");
    Ok((StatusCode::CREATED, Json(account)))
}

async fn find_account(state: &AppState, user_id: Uuid, account_id: Uuid) -> Result<Account> {
    state
        .db
        .get_account(user_id, account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ACCOUNT_NOT_FOUND.to_string()))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, account_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<Account>> {
    Ok(Json(find_account(&state, user_id, account_id).await?))
}

async fn account_balance(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, account_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<BalanceResponse>> {
    let account = find_account(&state, user_id, account_id).await?;
    Ok(Json(BalanceResponse {
        account_id: account.account_id,
        user_id: account.user_id,
        balance: account.balance,
        currency: account.currency,
        account_type: account.account_type,
    }))
}

/// Only the balance is mutable; a different name, type or currency means a new account.
async fn update_balance(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, account_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateBalanceRequest>,
) -> Result<Json<Account>> {
    let account = state
        .db
        .update_balance(user_id, account_id, req.balance)
        .await?
        .ok_or_else(|| AppError::NotFound(ACCOUNT_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, account_id = %account_id, "Account balance updated");
    Ok(Json(account))
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<Account>>> {
    let accounts = state.db.list_accounts(user_id, query.page()).await?;
    Ok(Json(non_empty(accounts, ACCOUNT_NOT_FOUND)?))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, account_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>> {
    let deleted_at = state
        .db
        .delete_account(user_id, account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ACCOUNT_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, account_id = %account_id, "Account deleted");
    Ok(deleted("account", deleted_at))
}
