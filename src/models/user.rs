//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Login email, stored lowercased
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}
