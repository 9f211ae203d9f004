// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Income and expense transactions.

use super::accounts::ACCOUNT_NOT_FOUND;
use super::categories::CATEGORY_NOT_FOUND;
use super::extract::{not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery};
use super::merchants::MERCHANT_NOT_FOUND;
use super::{deleted, non_empty, MessageResponse};
use crate::db::{DateWindow, TransactionFields, TransactionScope};
use crate::error::{AppError, FieldFailure, Result};
use crate::models::{Transaction, TransactionType};
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const TRANSACTION_NOT_FOUND: &str = "transaction(s) not found or deleted";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{user_id}/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/users/{user_id}/transactions/{transaction_id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route(
            "/users/{user_id}/accounts/{account_id}/transactions",
            get(list_account_transactions),
        )
        .route(
            "/users/{user_id}/categories/{category_id}/transactions",
            get(list_category_transactions),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransactionRequest {
    pub account_id: Uuid,
    pub category_id: Uuid,
    #[serde(default)]
    pub merchant_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
    pub transaction_type: TransactionType,
    /// Minor units, never zero
    pub amount: i64,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub notes: String,
    pub date: DateTime<Utc>,
}

/// Paging plus an optional exclusive `from`/`to` date window.
#[derive(Debug, Deserialize, Validate)]
pub struct TransactionListQuery {
    #[validate(required, range(min = 1))]
    pub page_id: Option<i64>,
    #[validate(required, range(min = 5, max = 10))]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl TransactionListQuery {
    fn window(&self) -> Result<DateWindow> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from >= to {
                return Err(AppError::BadRequest("from must be before to".to_string()));
            }
        }
        Ok(DateWindow {
            from: self.from,
            to: self.to,
        })
    }

    fn page(&self) -> crate::db::Page {
        PageQuery {
            page_id: self.page_id,
            page_size: self.page_size,
        }
        .page()
    }
}

/// Validate amounts and check that every referenced row is live and owned by `user_id`.
async fn resolve_fields(
    state: &AppState,
    user_id: Uuid,
    req: TransactionRequest,
) -> Result<TransactionFields> {
    if req.amount == 0 {
        return Err(AppError::Validation(vec![FieldFailure {
            failed_field: "amount".to_string(),
            tag: "required".to_string(),
            value: "field is empty".to_string(),
        }]));
    }

    if state.db.get_account(user_id, req.account_id).await?.is_none() {
        return Err(AppError::NotFound(ACCOUNT_NOT_FOUND.to_string()));
    }
    if state
        .db
        .get_category(user_id, req.category_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(CATEGORY_NOT_FOUND.to_string()));
    }
    if let Some(merchant_id) = req.merchant_id {
        if state.db.get_merchant(user_id, merchant_id).await?.is_none() {
            return Err(AppError::NotFound(MERCHANT_NOT_FOUND.to_string()));
        }
    }

    Ok(TransactionFields {
        account_id: req.account_id,
        category_id: req.category_id,
        merchant_id: req.merchant_id,
        name: req.name.trim().to_string(),
        transaction_type: req.transaction_type,
        amount: req.amount,
        notes: req.notes,
        date: req.date,
    })
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<TransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let fields = resolve_fields(&state, user_id, req).await?;
    let transaction = state.db.create_transaction(user_id, fields).await?;

    tracing::info!(
        user_id = %user_id,
        transaction_id = %transaction.id,
        amount = transaction.amount,
        "Transaction created"
    );
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, transaction_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<Transaction>> {
    let transaction = state
        .db
        .get_transaction(user_id, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(TRANSACTION_NOT_FOUND.to_string()))?;
    Ok(Json(transaction))
}

async fn update_transaction(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, transaction_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<TransactionRequest>,
) -> Result<Json<Transaction>> {
    let fields = resolve_fields(&state, user_id, req).await?;
    let transaction = state
        .db
        .update_transaction(user_id, transaction_id, fields)
        .await?
        .ok_or_else(|| AppError::NotFound(TRANSACTION_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, transaction_id = %transaction_id, "Transaction updated");
    Ok(Json(transaction))
}

async fn list(
    state: &AppState,
    user_id: Uuid,
    scope: TransactionScope,
    query: &TransactionListQuery,
) -> Result<Json<Vec<Transaction>>> {
    let transactions = state
        .db
        .list_transactions(user_id, scope, query.window()?, query.page())
        .await?;
    Ok(Json(non_empty(transactions, TRANSACTION_NOT_FOUND)?))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedQuery(query): ValidatedQuery<TransactionListQuery>,
) -> Result<Json<Vec<Transaction>>> {
    list(&state, user_id, TransactionScope::All, &query).await
}

async fn list_account_transactions(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, account_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedQuery(query): ValidatedQuery<TransactionListQuery>,
) -> Result<Json<Vec<Transaction>>> {
    list(&state, user_id, TransactionScope::Account(account_id), &query).await
}

async fn list_category_transactions(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, category_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedQuery(query): ValidatedQuery<TransactionListQuery>,
) -> Result<Json<Vec<Transaction>>> {
    list(&state, user_id, TransactionScope::Category(category_id), &query).await
}

async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, transaction_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>> {
    let deleted_at = state
        .db
        .delete_transaction(user_id, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(TRANSACTION_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, transaction_id = %transaction_id, "Transaction deleted");
    Ok(deleted("transaction", deleted_at))
}
