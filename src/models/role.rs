// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Roles: coarse permission tags attached to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ADMIN: &str = "admin";
const MAX_ROLE_LEN: usize = 32;

/// A lowercase alphanumeric role tag. Only `admin` has built-in meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Role(String);

impl Role {
    pub fn admin() -> Self {
        Role(ADMIN.to_string())
    }

    /// Normalize and validate a role name.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty()
            || name.len() > MAX_ROLE_LEN
            || !name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(Role(name))
    }

    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role granted to a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
