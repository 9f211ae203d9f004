// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::time_utils::format_utc_rfc3339;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    #[error("Request validation failed")]
    Validation(Vec<FieldFailure>),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A single failed field from request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub failed_field: String,
    pub tag: String,
    pub value: String,
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<FieldFailure>>,
    time: String,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) | AppError::Conflict(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details, failures) = match self {
            AppError::Unauthorized(msg) => ("unauthorized", Some(msg), None),
            AppError::InvalidToken => ("invalid_token", None, None),
            AppError::ExpiredToken => ("expired_token", None, None),
            AppError::Forbidden(msg) => ("forbidden", Some(msg), None),
            AppError::Conflict(msg) => ("conflict", Some(msg), None),
            AppError::NotFound(msg) => ("not_found", Some(msg), None),
            AppError::BadRequest(msg) => ("bad_request", Some(msg), None),
            AppError::Unprocessable(msg) => ("unprocessable_entity", Some(msg), None),
            AppError::Validation(failures) => ("validation_failed", None, Some(failures)),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            status: status.as_u16(),
            error: error.to_string(),
            details,
            failures,
            time: format_utc_rfc3339(chrono::Utc::now()),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut failures: Vec<FieldFailure> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| FieldFailure {
                    failed_field: field.clone(),
                    tag: err.code.to_string(),
                    value: describe_failure(err),
                })
            })
            .collect();
        failures.sort_by(|a, b| a.failed_field.cmp(&b.failed_field).then(a.tag.cmp(&b.tag)));
        AppError::Validation(failures)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                AppError::Conflict(db.message().to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

/// Human-readable value for a failed validation rule.
fn describe_failure(err: &validator::ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "required" => "field is empty".to_string(),
        "email" => "invalid email".to_string(),
        _ => {
            let mut bounds: Vec<String> = err
                .params
                .iter()
                .filter(|(name, _)| name.as_ref() != "value")
                .map(|(name, bound)| format!("{}={}", name, bound))
                .collect();
            bounds.sort();
            bounds.join(",")
        }
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 6, max = 55))]
        password: String,
    }

    #[test]
    fn test_validation_errors_become_field_failures() {
        let signup = Signup {
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
        };

        let err: AppError = signup.validate().unwrap_err().into();
        let AppError::Validation(failures) = err else {
            panic!("expected validation error");
        };

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].failed_field, "email");
        assert_eq!(failures[0].value, "invalid email");
        assert_eq!(failures[1].failed_field, "password");
        assert_eq!(failures[1].tag, "length");
        assert_eq!(failures[1].value, "max=55,min=6");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Conflict("dup".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Unprocessable("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Database("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
