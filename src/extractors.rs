//! Authentication Extractors
//!
//! Axum extractors for authentication and request metadata.

use crate::error::AuthError;
use crate::token::Claims;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Authenticated user information taken from validated claims
///
/// Only available behind [`crate::middleware::require_auth`]; the extractor
/// itself never validates a token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl AuthUser {
    /// Create user from JWT claims
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let id = claims.sub.parse::<Uuid>().map_err(|_| {
            tracing::debug!(sub = %claims.sub, "Token subject is not an account id");
            AuthError::Unauthenticated
        })?;

        Ok(Self {
            id,
            username: claims.username.clone(),
        })
    }

    /// Check if the resource id belongs to this user
    pub fn owns(&self, resource_id: &str) -> bool {
        resource_id
            .parse::<Uuid>()
            .map(|id| id == self.id)
            .unwrap_or(false)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or(AuthError::Unauthenticated)?;

        AuthUser::from_claims(claims)
    }
}

/// Client information (IP, user agent)
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .map(String::from)
            });

        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        Ok(ClientInfo { ip, user_agent })
    }
}
