// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spending and income categories.

use super::extract::{not_blank, PageQuery, ResourcePath, ValidatedJson, ValidatedQuery};
use super::{deleted, non_empty, MessageResponse};
use crate::db::CategoryFields;
use crate::error::{AppError, Result};
use crate::models::Category;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub(crate) const CATEGORY_NOT_FOUND: &str = "category does not exist or deleted";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{user_id}/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/users/{user_id}/categories/{category_id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
}

/// Check that `parent_id` names a live category of the same user other than `this`.
async fn check_parent(
    state: &AppState,
    user_id: Uuid,
    parent_id: Option<Uuid>,
    this: Option<Uuid>,
) -> Result<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if Some(parent_id) == this {
        return Err(AppError::BadRequest(
            "category cannot be its own parent".to_string(),
        ));
    }
    state
        .db
        .get_category(user_id, parent_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("parent category does not exist or deleted".to_string()))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedJson(req): ValidatedJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    check_parent(&state, user_id, req.parent_id, None).await?;

    let category = state
        .db
        .create_category(
            user_id,
            CategoryFields {
                parent_id: req.parent_id,
                name: req.name.trim().to_string(),
            },
        )
        .await?;

    tracing::info!(user_id = %user_id, category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, category_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<Category>> {
    let category = state
        .db
        .get_category(user_id, category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(CATEGORY_NOT_FOUND.to_string()))?;
    Ok(Json(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, category_id)): ResourcePath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<CategoryRequest>,
) -> Result<Json<Category>> {
    check_parent(&state, user_id, req.parent_id, Some(category_id)).await?;

    let category = state
        .db
        .update_category(
            user_id,
            category_id,
            CategoryFields {
                parent_id: req.parent_id,
                name: req.name.trim().to_string(),
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(CATEGORY_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, category_id = %category_id, "Category updated");
    Ok(Json(category))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    ResourcePath(user_id): ResourcePath<Uuid>,
    ValidatedQuery(query): ValidatedQuery<PageQuery>,
) -> Result<Json<Vec<Category>>> {
    let categories = state.db.list_categories(user_id, query.page()).await?;
    Ok(Json(non_empty(categories, CATEGORY_NOT_FOUND)?))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    ResourcePath((user_id, category_id)): ResourcePath<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>> {
    let deleted_at = state
        .db
        .delete_category(user_id, category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(CATEGORY_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user_id, category_id = %category_id, "Category deleted");
    Ok(deleted("category", deleted_at))
}
