// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merchants a user trades with.

use super::extract::{not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery};
use super::{deleted, non_empty, MessageResponse};
use crate::error::{AppError, Result};
use crate::models::Merchant;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub(crate) const MERCHANT_NOT_FOUND: &str = "merchant(s) not found or deleted";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{user_id}/merchants",
            get(list_merchants).post(create_merchant),
        )
        .route(
            "/users/{user_id}/merchants/{merchant_id}",
            get(get_merchant)
                .put(update_merchant)
                .delete(delete_merchant),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct MerchantRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
}

async fn create_merchant(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<MerchantRequest>,
) -> Result<(StatusCode, Json<Merchant>)> {
    let merchant = state.db.create_merchant(user_id, req.name.trim()).await?;
    tracing::info!(user_id = %user_id, merchant_id = %merchant.id, "Merchant created");
    Ok((StatusCode::CREATED, Json(merchant)))
}

async fn get_merchant(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, merchant_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<Merchant>> {
    let merchant = state
        .db
        .get_merchant(user_id, merchant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(MERCHANT_NOT_FOUND.to_string()))?;
    Ok(Json(merchant))
}

async fn update_merchant(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, merchant_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<MerchantRequest>,
) -> Result<Json<Merchant>> {
    let merchant = state
        .db
        .update_merchant(user_id, merchant_id, req.name.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(MERCHANT_NOT_FOUND.to_string()))?;
    Ok(Json(merchant))
}

async fn list_merchants(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<Merchant>>> {
    let merchants = state.db.list_merchants(user_id, query.page()).await?;
    Ok(Json(non_empty(merchants, MERCHANT_NOT_FOUND)?))
}

async fn delete_merchant(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, merchant_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>> {
    let deleted_at = state
        .db
        .delete_merchant(user_id, merchant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(MERCHANT_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, merchant_id = %merchant_id, "Merchant deleted");
    Ok(deleted("merchant", deleted_at))
}
