//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup. No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Longest accepted session token lifetime (30 days)
pub const MAX_TOKEN_LIFETIME_MINUTES: i64 = 30 * 24 * 60;

/// Parse an optional numeric environment variable, rejecting garbage
fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, AuthError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{name} is not a valid number: {v}"))),
        Err(_) => Ok(default),
    }
}

/// Authentication configuration loaded from environment
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Session token lifetime in minutes (from JWT_EXPIRATION_MINUTES env var)
    pub token_lifetime_minutes: i64,

    /// Minimum password length for signup and password change (from MIN_PASSWORD_LENGTH env var)
    pub min_password_length: usize,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// A missing `JWT_SECRET` is a configuration error; the server must not
    /// start without one.
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AuthError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        let config = Self {
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "sumdash".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "sumdash-app".to_string()),
            token_lifetime_minutes: parse_env("JWT_EXPIRATION_MINUTES", 60)?,
            min_password_length: parse_env("MIN_PASSWORD_LENGTH", 8)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.is_empty() {
            return Err(AuthError::Config("JWT_SECRET must not be empty".to_string()));
        }

        if self.jwt_secret.len() < 32 {
            tracing::warn!("JWT_SECRET is shorter than 32 bytes; use a longer secret in production");
        }

        if self.token_lifetime_minutes <= 0 {
            return Err(AuthError::Config(
                "JWT_EXPIRATION_MINUTES must be positive".to_string(),
            ));
        }

        if self.token_lifetime_minutes > MAX_TOKEN_LIFETIME_MINUTES {
            return Err(AuthError::Config(format!(
                "JWT_EXPIRATION_MINUTES must not exceed {MAX_TOKEN_LIFETIME_MINUTES}"
            )));
        }

        if self.min_password_length == 0 {
            return Err(AuthError::Config(
                "MIN_PASSWORD_LENGTH must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_lifetime_minutes", &self.token_lifetime_minutes)
            .field("min_password_length", &self.min_password_length)
            .finish()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: SocketAddr,

    /// PostgreSQL connection string (from DATABASE_URL env var); the
    /// in-memory directory is used when unset
    pub database_url: Option<String>,

    /// Allowed browser origin (from CORS_ORIGIN env var)
    pub cors_origin: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let raw_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| AuthError::Config(format!("BIND_ADDR is not a socket address: {raw_addr}")))?;

        Ok(Self {
            bind_addr,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
        })
    }
}
