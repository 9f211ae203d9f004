// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - tokens, passwords and role lookups.

pub mod password;
pub mod role_cache;
pub mod token;

pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking, HashError,
};
pub use role_cache::RoleCache;
pub use token::{within_refresh_window, AccessClaims, TokenError, TokenMaker, TokenPair};
