// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first if present, so local
//! development can keep secrets out of the shell environment.

use chrono::Duration;
use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Reported by `/version`
    pub build_version: String,
    /// Address the HTTP server binds to
    pub server_address: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Postgres connection string
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub db_max_connections: u32,
    /// How long to wait for a database connection
    pub db_timeout: std::time::Duration,
    /// Lifetime of access tokens
    pub token_duration: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_duration: Duration,
    /// Email that is granted the admin role on registration
    pub admin_email: Option<String>,

    // --- Secrets ---
    /// Signing key for access tokens (raw bytes)
    pub token_symmetric_key: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_symmetric_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            build_version: "test".to_string(),
            server_address: "127.0.0.1:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            database_url: "postgres://localhost/ledger_test".to_string(),
            db_max_connections: 2,
            db_timeout: std::time::Duration::from_secs(5),
            token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::hours(24),
            admin_email: Some("admin@example.com".to_string()),
            token_symmetric_key: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_symmetric_key: b"test_refresh_key_32_bytes_minimum".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            build_version: env::var("BUILD_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: match env::var("DB_MAX_CONNECTIONS") {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("DB_MAX_CONNECTIONS", raw))?,
                Err(_) => 12,
            },
            db_timeout: duration_var("DB_TIMEOUT", "5s")?
                .to_std()
                .map_err(|_| ConfigError::Invalid("DB_TIMEOUT", "negative".to_string()))?,
            token_duration: duration_var("TOKEN_DURATION", "15m")?,
            refresh_token_duration: duration_var("REFRESH_TOKEN_DURATION", "24h")?,
            admin_email: env::var("ADMIN_EMAIL")
                .ok()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty()),

            token_symmetric_key: env::var("TOKEN_SYMMETRIC_KEY")
                .map_err(|_| ConfigError::Missing("TOKEN_SYMMETRIC_KEY"))?
                .into_bytes(),
            refresh_token_symmetric_key: env::var("REFRESH_TOKEN_SYMMETRIC_KEY")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SYMMETRIC_KEY"))?
                .into_bytes(),
        })
    }
}

/// Read a duration variable, falling back to `default` when unset.
fn duration_var(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_duration(&raw).ok_or(ConfigError::Invalid(name, raw))
}

/// Longest token lifetime accepted from configuration, in days.
const MAX_DURATION_DAYS: i64 = 3650;

/// Parse `90`, `90s`, `15m`, `24h` or `7d` into a duration of at most ten years.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        _ => (raw, 's'),
    };
    let value: i64 = digits.parse().ok()?;
    if value < 0 {
        return None;
    }

    let duration = match unit {
        's' => Duration::try_seconds(value),
        'm' => Duration::try_minutes(value),
        'h' => Duration::try_hours(value),
        'd' => Duration::try_days(value),
        _ => None,
    }?;
    (duration <= Duration::days(MAX_DURATION_DAYS)).then_some(duration)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
