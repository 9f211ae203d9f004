// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postgres queries.
//!
//! Soft-deleted rows are filtered with `deleted_at IS NULL` in every query,
//! and list queries order deterministically so LIMIT/OFFSET paging is stable.

use super::messages::{ACCOUNT_TAKEN, EMAIL_TAKEN, ROLE_NOT_HELD, ROLE_TAKEN};
use super::{
    CategoryFields, DateWindow, NewAccount, NewUser, Page, TransactionFields, TransactionScope,
};
use crate::error::AppError;
use crate::models::{Account, Category, Merchant, Role, Session, Transaction, User, UserRole};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, password_changed_at, created_at, deleted_at";
const ACCOUNT_COLUMNS: &str =
    "account_id, user_id, account_name, account_type, balance, currency, created_at, deleted_at";
const CATEGORY_COLUMNS: &str = "id, parent_id, user_id, name, created_at, deleted_at";
const MERCHANT_COLUMNS: &str = "id, user_id, name, created_at, deleted_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, merchant_id, name, \
     transaction_type, amount, notes, date, created_at, deleted_at";

/// Map a unique violation to a conflict with a fixed message.
fn conflict_as(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => err.into(),
    }
}

// ─── Users ─────────────────────────────────────────────────────

pub async fn create_user(pool: &PgPool, new: NewUser) -> Result<User, AppError> {
    let sql = format!(
        "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_as(e, EMAIL_TAKEN))
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
        USER_COLUMNS
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
        USER_COLUMNS
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_users(pool: &PgPool, page: Page) -> Result<Vec<User>, AppError> {
    let sql = format!(
        "SELECT {} FROM users WHERE deleted_at IS NULL \
         ORDER BY created_at, id LIMIT $1 OFFSET $2",
        USER_COLUMNS
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<Option<User>, AppError> {
    let sql = format!(
        "UPDATE users SET password_hash = $2, password_changed_at = now() \
         WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
        USER_COLUMNS
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .bind(password_hash)
        .fetch_optional(pool)
        .await?)
}

pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
    Ok(sqlx::query_scalar::<_, DateTime<Utc>>(
        "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL \
         RETURNING deleted_at",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

// ─── Sessions ──────────────────────────────────────────────────

pub async fn save_session(pool: &PgPool, session: Session) -> Result<Session, AppError> {
    Ok(sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (user_id, device_id, refresh_token, expires_at, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, device_id) DO UPDATE SET \
           refresh_token = EXCLUDED.refresh_token, \
           expires_at = EXCLUDED.expires_at, \
           created_at = EXCLUDED.created_at \
         RETURNING user_id, device_id, refresh_token, expires_at, created_at",
    )
    .bind(session.user_id)
    .bind(&session.device_id)
    .bind(&session.refresh_token)
    .bind(session.expires_at)
    .bind(session.created_at)
    .fetch_one(pool)
    .await?)
}

pub async fn get_session(
    pool: &PgPool,
    user_id: Uuid,
    device_id: &str,
    refresh_token: &str,
    now: i64,
) -> Result<Option<Session>, AppError> {
    Ok(sqlx::query_as::<_, Session>(
        "SELECT user_id, device_id, refresh_token, expires_at, created_at FROM sessions \
         WHERE user_id = $1 AND device_id = $2 AND refresh_token = $3 AND expires_at > $4",
    )
    .bind(user_id)
    .bind(device_id)
    .bind(refresh_token)
    .bind(now)
    .fetch_optional(pool)
    .await?)
}

// ─── Roles ─────────────────────────────────────────────────────

pub async fn grant_role(pool: &PgPool, user_id: Uuid, role: &Role) -> Result<UserRole, AppError> {
    sqlx::query_as::<_, UserRole>(
        "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) \
         RETURNING user_id, role, created_at",
    )
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_as(e, ROLE_TAKEN))
}

pub async fn revoke_role(pool: &PgPool, user_id: Uuid, role: &Role) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(ROLE_NOT_HELD.to_string()));
    }
    Ok(())
}

pub async fn roles_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Role>, AppError> {
    Ok(sqlx::query_scalar::<_, Role>(
        "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY created_at, role",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn list_roles(pool: &PgPool, user_id: Uuid, page: Page) -> Result<Vec<UserRole>, AppError> {
    Ok(sqlx::query_as::<_, UserRole>(
        "SELECT user_id, role, created_at FROM user_roles WHERE user_id = $1 \
         ORDER BY created_at, role LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?)
}

pub async fn list_users_with_role(
    pool: &PgPool,
    role: &Role,
    page: Page,
) -> Result<Vec<User>, AppError> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT u.id, u.email, u.password_hash, u.password_changed_at, u.created_at, u.deleted_at \
         FROM users u JOIN user_roles r ON r.user_id = u.id \
         WHERE r.role = $1 AND u.deleted_at IS NULL \
         ORDER BY u.created_at, u.id LIMIT $2 OFFSET $3",
    )
    .bind(role)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?)
}

// ─── Accounts ──────────────────────────────────────────────────

pub async fn create_account(pool: &PgPool, new: NewAccount) -> Result<Account, AppError> {
    let sql = format!(
        "INSERT INTO accounts (account_id, user_id, account_name, account_type, balance, currency) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, Account>(&sql)
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.account_name)
        .bind(new.account_type)
        .bind(new.balance)
        .bind(new.currency)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_as(e, ACCOUNT_TAKEN))
}

pub async fn get_account(
    pool: &PgPool,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<Option<Account>, AppError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE account_id = $1 AND user_id = $2 AND deleted_at IS NULL",
        ACCOUNT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Account>(&sql)
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn update_balance(
    pool: &PgPool,
    user_id: Uuid,
    account_id: Uuid,
    balance: i64,
) -> Result<Option<Account>, AppError> {
    let sql = format!(
        "UPDATE accounts SET balance = $3 \
         WHERE account_id = $1 AND user_id = $2 AND deleted_at IS NULL RETURNING {}",
        ACCOUNT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Account>(&sql)
        .bind(account_id)
        .bind(user_id)
        .bind(balance)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_accounts(pool: &PgPool, user_id: Uuid, page: Page) -> Result<Vec<Account>, AppError> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE user_id = $1 AND deleted_at IS NULL \
         ORDER BY created_at, account_id LIMIT $2 OFFSET $3",
        ACCOUNT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Account>(&sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn delete_account(
    pool: &PgPool,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<Option<DateTime<Utc>>, AppError> {
    soft_delete(pool, "accounts", "account_id", user_id, account_id).await
}

// ─── Categories ────────────────────────────────────────────────

pub async fn create_category(
    pool: &PgPool,
    user_id: Uuid,
    fields: CategoryFields,
) -> Result<Category, AppError> {
    let sql = format!(
        "INSERT INTO categories (id, parent_id, user_id, name) VALUES ($1, $2, $3, $4) RETURNING {}",
        CATEGORY_COLUMNS
    );
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(Uuid::new_v4())
        .bind(fields.parent_id)
        .bind(user_id)
        .bind(&fields.name)
        .fetch_one(pool)
        .await?)
}

pub async fn get_category(
    pool: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<Option<Category>, AppError> {
    let sql = format!(
        "SELECT {} FROM categories WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        CATEGORY_COLUMNS
    );
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn update_category(
    pool: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
    fields: CategoryFields,
) -> Result<Option<Category>, AppError> {
    let sql = format!(
        "UPDATE categories SET parent_id = $3, name = $4 \
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL RETURNING {}",
        CATEGORY_COLUMNS
    );
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(category_id)
        .bind(user_id)
        .bind(fields.parent_id)
        .bind(&fields.name)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_categories(
    pool: &PgPool,
    user_id: Uuid,
    page: Page,
) -> Result<Vec<Category>, AppError> {
    let sql = format!(
        "SELECT {} FROM categories WHERE user_id = $1 AND deleted_at IS NULL \
         ORDER BY created_at, id LIMIT $2 OFFSET $3",
        CATEGORY_COLUMNS
    );
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn delete_category(
    pool: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<Option<DateTime<Utc>>, AppError> {
    soft_delete(pool, "categories", "id", user_id, category_id).await
}

// ─── Merchants ─────────────────────────────────────────────────

pub async fn create_merchant(pool: &PgPool, user_id: Uuid, name: &str) -> Result<Merchant, AppError> {
    let sql = format!(
        "INSERT INTO merchants (id, user_id, name) VALUES ($1, $2, $3) RETURNING {}",
        MERCHANT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Merchant>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(pool)
        .await?)
}

pub async fn get_merchant(
    pool: &PgPool,
    user_id: Uuid,
    merchant_id: Uuid,
) -> Result<Option<Merchant>, AppError> {
    let sql = format!(
        "SELECT {} FROM merchants WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        MERCHANT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Merchant>(&sql)
        .bind(merchant_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn update_merchant(
    pool: &PgPool,
    user_id: Uuid,
    merchant_id: Uuid,
    name: &str,
) -> Result<Option<Merchant>, AppError> {
    let sql = format!(
        "UPDATE merchants SET name = $3 \
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL RETURNING {}",
        MERCHANT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Merchant>(&sql)
        .bind(merchant_id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_merchants(
    pool: &PgPool,
    user_id: Uuid,
    page: Page,
) -> Result<Vec<Merchant>, AppError> {
    let sql = format!(
        "SELECT {} FROM merchants WHERE user_id = $1 AND deleted_at IS NULL \
         ORDER BY created_at, id LIMIT $2 OFFSET $3",
        MERCHANT_COLUMNS
    );
    Ok(sqlx::query_as::<_, Merchant>(&sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn delete_merchant(
    pool: &PgPool,
    user_id: Uuid,
    merchant_id: Uuid,
) -> Result<Option<DateTime<Utc>>, AppError> {
    soft_delete(pool, "merchants", "id", user_id, merchant_id).await
}

// ─── Transactions ──────────────────────────────────────────────

pub async fn create_transaction(
    pool: &PgPool,
    user_id: Uuid,
    fields: TransactionFields,
) -> Result<Transaction, AppError> {
    let sql = format!(
        "INSERT INTO transactions \
         (id, user_id, account_id, category_id, merchant_id, name, transaction_type, amount, notes, date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        TRANSACTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(fields.account_id)
        .bind(fields.category_id)
        .bind(fields.merchant_id)
        .bind(&fields.name)
        .bind(fields.transaction_type)
        .bind(fields.amount)
        .bind(&fields.notes)
        .bind(fields.date)
        .fetch_one(pool)
        .await?)
}

pub async fn get_transaction(
    pool: &PgPool,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Option<Transaction>, AppError> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        TRANSACTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn update_transaction(
    pool: &PgPool,
    user_id: Uuid,
    transaction_id: Uuid,
    fields: TransactionFields,
) -> Result<Option<Transaction>, AppError> {
    let sql = format!(
        "UPDATE transactions SET account_id = $3, category_id = $4, merchant_id = $5, name = $6, \
         transaction_type = $7, amount = $8, notes = $9, date = $10 \
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL RETURNING {}",
        TRANSACTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(transaction_id)
        .bind(user_id)
        .bind(fields.account_id)
        .bind(fields.category_id)
        .bind(fields.merchant_id)
        .bind(&fields.name)
        .bind(fields.transaction_type)
        .bind(fields.amount)
        .bind(&fields.notes)
        .bind(fields.date)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_transactions(
    pool: &PgPool,
    user_id: Uuid,
    scope: TransactionScope,
    window: DateWindow,
    page: Page,
) -> Result<Vec<Transaction>, AppError> {
    let (scope_filter, scope_id) = match scope {
        TransactionScope::All => (" AND $2::uuid IS NULL", None),
        TransactionScope::Account(id) => (" AND account_id = $2", Some(id)),
        TransactionScope::Category(id) => (" AND category_id = $2", Some(id)),
    };
    // NULL bounds leave that side of the window open.
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id = $1 AND deleted_at IS NULL{} \
         AND ($3::timestamptz IS NULL OR date > $3) \
         AND ($4::timestamptz IS NULL OR date < $4) \
         ORDER BY date DESC, id LIMIT $5 OFFSET $6",
        TRANSACTION_COLUMNS, scope_filter
    );
    Ok(sqlx::query_as::<_, Transaction>(&sql)
        .bind(user_id)
        .bind(scope_id)
        .bind(window.from)
        .bind(window.to)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn delete_transaction(
    pool: &PgPool,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Option<DateTime<Utc>>, AppError> {
    soft_delete(pool, "transactions", "id", user_id, transaction_id).await
}

/// Stamp `deleted_at` on a live row owned by `user_id`. Table and column names are constants.
async fn soft_delete(
    pool: &PgPool,
    table: &'static str,
    id_column: &'static str,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let sql = format!(
        "UPDATE {table} SET deleted_at = now() \
         WHERE {id_column} = $1 AND user_id = $2 AND deleted_at IS NULL \
         RETURNING deleted_at"
    );
    Ok(sqlx::query_scalar::<_, DateTime<Utc>>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}
