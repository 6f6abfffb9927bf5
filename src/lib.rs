//! SumDash Authentication
//!
//! Authentication backend for the SumDash quiz game providing:
//! - Account signup and login (by email or username)
//! - PBKDF2-HMAC-SHA256 password hashing with constant-time verification
//! - HS256 JWT session tokens with issuer/audience/expiry enforcement
//! - Bearer-token middleware for protected routes
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables at startup:
//! - `JWT_SECRET` - Secret key for signing JWTs (required)
//! - `JWT_ISSUER` - JWT issuer claim (default: "sumdash")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "sumdash-app")
//! - `JWT_EXPIRATION_MINUTES` - Token lifetime in minutes (default: 60)
//! - `MIN_PASSWORD_LENGTH` - Password policy for signup (default: 8)
//! - `DATABASE_URL` - PostgreSQL connection string (optional)
//!
//! # Usage
//!
//! ```rust,ignore
//! use sumdash_auth::{create_auth_service, create_routes, AuthConfig, InMemoryDirectory};
//!
//! let config = AuthConfig::from_env()?;
//! let auth = create_auth_service(config, Arc::new(InMemoryDirectory::new()))?;
//! let app = create_routes(auth);
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, ServerConfig};
pub use directory::{AccountDirectory, InMemoryDirectory, PgDirectory};
pub use error::{AuthError, DirectoryError, PasswordError, TokenError};
pub use extractors::{AuthUser, ClientInfo};
pub use handlers::AuthState;
pub use models::*;
pub use service::{AuthService, LoginOutcome};
pub use token::{Claims, IssuedToken, SigningContext, TokenService};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the authentication service from configuration
///
/// The signing context is fixed here for the lifetime of the process.
pub fn create_auth_service(
    config: AuthConfig,
    directory: Arc<dyn AccountDirectory>,
) -> Result<Arc<AuthService>, AuthError> {
    config.validate()?;

    let context = SigningContext::from_config(&config)?;
    tracing::info!(
        issuer = context.issuer(),
        audience = context.audience(),
        lifetime_minutes = context.token_lifetime().num_minutes(),
        "Token signing context initialised"
    );

    let tokens = Arc::new(TokenService::new(context));
    Ok(Arc::new(AuthService::new(directory, tokens, config)))
}

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    handlers::create_routes(auth_service)
}

/// CORS policy for the mobile client origin
///
/// Only the methods and headers the routes actually use are allowed.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, AuthError> {
    let origin = origin.parse::<HeaderValue>().map_err(|_| {
        AuthError::Config(format!("CORS_ORIGIN is not a valid header value: {origin}"))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}
