//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.
//!
//! Each component has its own error enum carrying the precise internal
//! reason. [`AuthError`] is what leaves the crate: every credential or token
//! failure collapses into [`AuthError::Unauthenticated`] so an HTTP caller
//! cannot tell an unknown account from a wrong password, or an expired token
//! from a forged one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Password hashing and verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Invalid credential format: {0}")]
    InvalidFormat(String),

    #[error("Credential was produced by a retired hashing scheme")]
    UnsupportedScheme,
}

/// Token issuance and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,

    #[error("Token issuer does not match")]
    IssuerMismatch,

    #[error("Token audience does not match")]
    AudienceMismatch,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Account directory errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("An account with this {0} already exists")]
    Conflict(&'static str),

    #[error("Account not found")]
    NotFound,

    #[error("Directory backend error: {0}")]
    Backend(String),
}

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Access to this resource is not allowed")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("{0} already registered")]
    AccountExists(&'static str),

    #[error("Password does not meet requirements")]
    WeakPassword,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Invalid credential format")]
    InvalidCredentialFormat,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
            ),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                self.to_string(),
            ),
            AuthError::AccountExists(_) => (
                StatusCode::CONFLICT,
                "account_exists",
                self.to_string(),
            ),
            AuthError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "weak_password",
                self.to_string(),
            ),
            AuthError::EmptyPassword => (
                StatusCode::BAD_REQUEST,
                "empty_password",
                self.to_string(),
            ),
            AuthError::InvalidCredentialFormat => (
                StatusCode::BAD_REQUEST,
                "invalid_credential_format",
                self.to_string(),
            ),
            AuthError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
            AuthError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                "Server configuration error".to_string(),
            ),
            AuthError::Database(_) | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::EmptyPassword => AuthError::EmptyPassword,
            PasswordError::InvalidFormat(_) | PasswordError::UnsupportedScheme => {
                AuthError::InvalidCredentialFormat
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => {
                tracing::error!("Token signing failed: {}", reason);
                AuthError::Internal
            }
            other => {
                tracing::debug!(reason = %other, "Token rejected");
                AuthError::Unauthenticated
            }
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict(field) => AuthError::AccountExists(field),
            DirectoryError::NotFound => AuthError::UserNotFound,
            DirectoryError::Backend(msg) => {
                tracing::error!("Account directory error: {}", msg);
                AuthError::Database(msg)
            }
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let field = match db_err.constraint() {
                    Some(c) if c.contains("email") => "email",
                    _ => "username",
                };
                return DirectoryError::Conflict(field);
            }
        }
        DirectoryError::Backend(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
            ErrorKind::InvalidAudience => TokenError::AudienceMismatch,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}
