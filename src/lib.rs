// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger API: personal-finance REST backend
//!
//! This crate provides user accounts, authentication, financial accounts,
//! categories, merchants and transactions over JSON/HTTP, with JWT bearer
//! auth and role-based authorization.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{RoleCache, TokenMaker};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub tokens: TokenMaker,
    pub role_cache: RoleCache,
}

impl AppState {
    /// Build state from config and an already-connected database.
    pub fn new(config: Config, db: Database) -> Result<Self, services::TokenError> {
        let tokens = TokenMaker::new(
            &config.token_symmetric_key,
            &config.refresh_token_symmetric_key,
        )?;

        Ok(Self {
            config,
            db,
            tokens,
            role_cache: RoleCache::default(),
        })
    }
}
