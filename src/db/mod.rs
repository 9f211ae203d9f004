// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Database`] fronts either a Postgres pool or an in-memory store. Both
//! backends share the same soft-delete rules: rows with `deleted_at` set are
//! invisible to every read, and every user-owned lookup is scoped by user id.

mod memory;
mod postgres;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    Account, AccountType, Category, Currency, Merchant, Role, Session, Transaction,
    TransactionType, User, UserRole,
};
use chrono::{DateTime, Utc};
use memory::MemoryStore;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use uuid::Uuid;

/// Messages shared by both backends for constraint failures.
pub mod messages {
    pub const EMAIL_TAKEN: &str = "user with email exists";
    pub const ACCOUNT_TAKEN: &str = "account already exists";
    pub const ROLE_TAKEN: &str = "role already allocated to user";
    pub const ROLE_NOT_HELD: &str = "user does not have role";
}

/// Fields for a new user. The email must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub account_name: String,
    pub account_type: AccountType,
    pub balance: i64,
    pub currency: Currency,
}

/// Create or update payload for a category.
#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub parent_id: Option<Uuid>,
    pub name: String,
}

/// Create or update payload for a transaction.
#[derive(Debug, Clone)]
pub struct TransactionFields {
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub merchant_id: Option<Uuid>,
    pub name: String,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub notes: String,
    pub date: DateTime<Utc>,
}

/// LIMIT/OFFSET window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Exclusive date bounds for transaction lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| date > from) && self.to.is_none_or(|to| date < to)
    }
}

/// Which transactions a list query selects, always within one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionScope {
    All,
    Account(Uuid),
    Category(Uuid),
}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory(Arc<MemoryStore>),
}

/// Handle to the application's store.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connect to Postgres and apply pending migrations.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Postgres: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;

        tracing::info!(
            max_connections = config.db_max_connections,
            "Connected to Postgres"
        );

        Ok(Self {
            backend: Backend::Postgres(pool),
        })
    }

    /// Create an empty in-memory store (offline mode and tests).
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    // ─── Users ─────────────────────────────────────────────────

    pub async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::create_user(pool, new).await,
            Backend::Memory(store) => store.create_user(new),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::get_user(pool, user_id).await,
            Backend::Memory(store) => Ok(store.get_user(user_id)),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::get_user_by_email(pool, email).await,
            Backend::Memory(store) => Ok(store.get_user_by_email(email)),
        }
    }

    pub async fn list_users(&self, page: Page) -> Result<Vec<User>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_users(pool, page).await,
            Backend::Memory(store) => Ok(store.list_users(page)),
        }
    }

    pub async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::update_password(pool, user_id, password_hash).await,
            Backend::Memory(store) => Ok(store.update_password(user_id, password_hash)),
        }
    }

    /// Soft-delete a user. Returns the deletion time, or `None` if no live user matched.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::delete_user(pool, user_id).await,
            Backend::Memory(store) => Ok(store.delete_user(user_id)),
        }
    }

    // ─── Sessions ──────────────────────────────────────────────

    /// Store the current refresh token for a (user, device) pair, replacing any previous one.
    pub async fn save_session(&self, session: Session) -> Result<Session, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::save_session(pool, session).await,
            Backend::Memory(store) => Ok(store.save_session(session)),
        }
    }

    /// Find a session matching user, device and token that has not expired at `now`.
    pub async fn get_session(
        &self,
        user_id: Uuid,
        device_id: &str,
        refresh_token: &str,
        now: i64,
    ) -> Result<Option<Session>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::get_session(pool, user_id, device_id, refresh_token, now).await
            }
            Backend::Memory(store) => Ok(store.get_session(user_id, device_id, refresh_token, now)),
        }
    }

    // ─── Roles ─────────────────────────────────────────────────

    pub async fn grant_role(&self, user_id: Uuid, role: &Role) -> Result<UserRole, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::grant_role(pool, user_id, role).await,
            Backend::Memory(store) => store.grant_role(user_id, role),
        }
    }

    pub async fn revoke_role(&self, user_id: Uuid, role: &Role) -> Result<(), AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::revoke_role(pool, user_id, role).await,
            Backend::Memory(store) => store.revoke_role(user_id, role),
        }
    }

    /// All roles held by a user, oldest grant first.
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::roles_for_user(pool, user_id).await,
            Backend::Memory(store) => Ok(store.roles_for_user(user_id)),
        }
    }

    pub async fn list_roles(&self, user_id: Uuid, page: Page) -> Result<Vec<UserRole>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_roles(pool, user_id, page).await,
            Backend::Memory(store) => Ok(store.list_roles(user_id, page)),
        }
    }

    /// Live users holding `role`.
    pub async fn list_users_with_role(&self, role: &Role, page: Page) -> Result<Vec<User>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_users_with_role(pool, role, page).await,
            Backend::Memory(store) => Ok(store.list_users_with_role(role, page)),
        }
    }

    // ─── Accounts ──────────────────────────────────────────────

    pub async fn create_account(&self, new: NewAccount) -> Result<Account, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::create_account(pool, new).await,
            Backend::Memory(store) => store.create_account(new),
        }
    }

    pub async fn get_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Account>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::get_account(pool, user_id, account_id).await,
            Backend::Memory(store) => Ok(store.get_account(user_id, account_id)),
        }
    }

    pub async fn update_balance(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        balance: i64,
    ) -> Result<Option<Account>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::update_balance(pool, user_id, account_id, balance).await
            }
            Backend::Memory(store) => Ok(store.update_balance(user_id, account_id, balance)),
        }
    }

    pub async fn list_accounts(&self, user_id: Uuid, page: Page) -> Result<Vec<Account>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_accounts(pool, user_id, page).await,
            Backend::Memory(store) => Ok(store.list_accounts(user_id, page)),
        }
    }

    pub async fn delete_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::delete_account(pool, user_id, account_id).await,
            Backend::Memory(store) => Ok(store.delete_account(user_id, account_id)),
        }
    }

    // ─── Categories ────────────────────────────────────────────

    pub async fn create_category(
        &self,
        user_id: Uuid,
        fields: CategoryFields,
    ) -> Result<Category, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::create_category(pool, user_id, fields).await,
            Backend::Memory(store) => Ok(store.create_category(user_id, fields)),
        }
    }

    pub async fn get_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Category>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::get_category(pool, user_id, category_id).await,
            Backend::Memory(store) => Ok(store.get_category(user_id, category_id)),
        }
    }

    pub async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        fields: CategoryFields,
    ) -> Result<Option<Category>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::update_category(pool, user_id, category_id, fields).await
            }
            Backend::Memory(store) => Ok(store.update_category(user_id, category_id, fields)),
        }
    }

    pub async fn list_categories(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<Category>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_categories(pool, user_id, page).await,
            Backend::Memory(store) => Ok(store.list_categories(user_id, page)),
        }
    }

    pub async fn delete_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::delete_category(pool, user_id, category_id).await,
            Backend::Memory(store) => Ok(store.delete_category(user_id, category_id)),
        }
    }

    // ─── Merchants ─────────────────────────────────────────────

    pub async fn create_merchant(&self, user_id: Uuid, name: &str) -> Result<Merchant, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::create_merchant(pool, user_id, name).await,
            Backend::Memory(store) => Ok(store.create_merchant(user_id, name)),
        }
    }

    pub async fn get_merchant(
        &self,
        user_id: Uuid,
        merchant_id: Uuid,
    ) -> Result<Option<Merchant>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::get_merchant(pool, user_id, merchant_id).await,
            Backend::Memory(store) => Ok(store.get_merchant(user_id, merchant_id)),
        }
    }

    pub async fn update_merchant(
        &self,
        user_id: Uuid,
        merchant_id: Uuid,
        name: &str,
    ) -> Result<Option<Merchant>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::update_merchant(pool, user_id, merchant_id, name).await
            }
            Backend::Memory(store) => Ok(store.update_merchant(user_id, merchant_id, name)),
        }
    }

    pub async fn list_merchants(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<Merchant>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::list_merchants(pool, user_id, page).await,
            Backend::Memory(store) => Ok(store.list_merchants(user_id, page)),
        }
    }

    pub async fn delete_merchant(
        &self,
        user_id: Uuid,
        merchant_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::delete_merchant(pool, user_id, merchant_id).await,
            Backend::Memory(store) => Ok(store.delete_merchant(user_id, merchant_id)),
        }
    }

    // ─── Transactions ──────────────────────────────────────────

    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        fields: TransactionFields,
    ) -> Result<Transaction, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => postgres::create_transaction(pool, user_id, fields).await,
            Backend::Memory(store) => Ok(store.create_transaction(user_id, fields)),
        }
    }

    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::get_transaction(pool, user_id, transaction_id).await
            }
            Backend::Memory(store) => Ok(store.get_transaction(user_id, transaction_id)),
        }
    }

    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        fields: TransactionFields,
    ) -> Result<Option<Transaction>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::update_transaction(pool, user_id, transaction_id, fields).await
            }
            Backend::Memory(store) => Ok(store.update_transaction(user_id, transaction_id, fields)),
        }
    }

    /// Transactions for a user, newest first, within an optional exclusive date window.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        scope: TransactionScope,
        window: DateWindow,
        page: Page,
    ) -> Result<Vec<Transaction>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::list_transactions(pool, user_id, scope, window, page).await
            }
            Backend::Memory(store) => Ok(store.list_transactions(user_id, scope, window, page)),
        }
    }

    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                postgres::delete_transaction(pool, user_id, transaction_id).await
            }
            Backend::Memory(store) => Ok(store.delete_transaction(user_id, transaction_id)),
        }
    }
}
