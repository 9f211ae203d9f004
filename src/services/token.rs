// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT access/refresh token issuance and verification.
//!
//! Access and refresh tokens are signed with separate HS256 keys, so a token of
//! one kind never verifies as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Minimum length of each signing key, in bytes.
pub const MIN_SYMMETRIC_KEY_SIZE: usize = 32;

/// A new token pair is only issued when the access token expires within this many seconds.
pub const REFRESH_WINDOW_SECS: i64 = 30;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token ID
    pub jti: Uuid,
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Unique per token, so two refresh tokens issued in the same second differ
    pub jti: Uuid,
    pub sub: Uuid,
    pub exp: i64,
}

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: i64,
    /// Stored with the session rather than returned to the client
    #[serde(skip)]
    pub refresh_token_expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("invalid key size: at least 32 bytes required")]
    KeySize,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token lifetime out of range")]
    Lifetime,
}

/// Issues and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenMaker {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl TokenMaker {
    pub fn new(access_key: &[u8], refresh_key: &[u8]) -> Result<Self, TokenError> {
        if access_key.len() < MIN_SYMMETRIC_KEY_SIZE || refresh_key.len() < MIN_SYMMETRIC_KEY_SIZE
        {
            return Err(TokenError::KeySize);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            access_encoding: EncodingKey::from_secret(access_key),
            access_decoding: DecodingKey::from_secret(access_key),
            refresh_encoding: EncodingKey::from_secret(refresh_key),
            refresh_decoding: DecodingKey::from_secret(refresh_key),
            validation,
        })
    }

    /// Create a signed access token valid for `duration`.
    pub fn create_access_token(
        &self,
        user_id: Uuid,
        duration: Duration,
    ) -> Result<(String, AccessClaims), TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            jti: Uuid::new_v4(),
            sub: user_id,
            iat: now.timestamp(),
            exp: expiry(now, duration)?,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        tracing::debug!(user_id = %user_id, exp = claims.exp, "Access token created");
        Ok((token, claims))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access_decoding)
    }

    /// Create a signed refresh token valid for `duration`.
    pub fn create_refresh_token(
        &self,
        user_id: Uuid,
        duration: Duration,
    ) -> Result<(String, RefreshClaims), TokenError> {
        let claims = RefreshClaims {
            jti: Uuid::new_v4(),
            sub: user_id,
            exp: expiry(Utc::now(), duration)?,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        tracing::debug!(user_id = %user_id, exp = claims.exp, "Refresh token created");
        Ok((token, claims))
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh_decoding)
    }

    /// Issue a fresh access/refresh pair for a user.
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        access_duration: Duration,
        refresh_duration: Duration,
    ) -> Result<TokenPair, TokenError> {
        let (access_token, access) = self.create_access_token(user_id, access_duration)?;
        let (refresh_token, refresh) = self.create_refresh_token(user_id, refresh_duration)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_token_expires_at: access.exp,
            refresh_token_expires_at: refresh.exp,
        })
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Result<T, TokenError> {
        decode::<T>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

fn expiry(now: DateTime<Utc>, duration: Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(duration)
        .map(|at| at.timestamp())
        .ok_or(TokenError::Lifetime)
}

/// Whether an access token is close enough to expiry to be refreshed.
pub fn within_refresh_window(claims: &AccessClaims, now: i64) -> bool {
    claims.exp - now <= REFRESH_WINDOW_SECS
}
