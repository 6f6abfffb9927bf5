//! Authentication Middleware
//!
//! Bearer-token gate for protected routes. The token service is injected as
//! router state; nothing is read from the environment per request.

use crate::error::AuthError;
use crate::token::TokenService;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Require authenticated user
///
/// Validates the bearer token and stores the claims in request extensions
/// for use by extractors. Requests without a valid token never reach the
/// handler.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!(path = %req.uri().path(), "Missing bearer token");
        AuthError::Unauthenticated
    })?;

    let claims = tokens.validate(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
