// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, permissions, security headers).

pub mod auth;
pub mod permission;
pub mod security;

pub use auth::{require_auth, AuthUser};
pub use permission::{authorize, Guard, Permission};
