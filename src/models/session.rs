//! Login session: one live refresh token per user and device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub user_id: Uuid,
    /// Client-chosen identifier for the device holding the token
    pub device_id: String,
    pub refresh_token: String,
    /// Refresh token expiry (Unix timestamp)
    pub expires_at: i64,
    pub created_at: DateTime<Utc>,
}
