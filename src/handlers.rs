//! Authentication HTTP Handlers
//!
//! REST API endpoints for signup, login and the account's own profile.

use crate::error::AuthError;
use crate::extractors::{AuthUser, ClientInfo};
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/auth/me", get(get_current_user))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/user/:id", get(get_user_profile))
        .layer(axum_middleware::from_fn_with_state(
            auth_service.tokens().clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(auth_service)
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================
// Signup / Login
// ============================================

/// POST /api/auth/signup
///
/// Register a new account
pub async fn signup(
    State(auth): State<AuthState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let account = auth
        .sign_up(&req.username, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User created successfully.",
            "user": AccountResponse::from(account)
        })),
    ))
}

/// POST /api/auth/login
///
/// Authenticate by email or username and return a session token
pub async fn login(
    State(auth): State<AuthState>,
    ClientInfo { ip, user_agent }: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let outcome = match auth.login(&req.identifier, &req.password).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if matches!(err, AuthError::Unauthenticated) {
                tracing::warn!(
                    ip = ip.as_deref().unwrap_or("unknown"),
                    user_agent = user_agent.as_deref().unwrap_or("unknown"),
                    "Failed login attempt"
                );
            }
            return Err(err);
        }
    };

    let expires_in = auth.tokens().context().token_lifetime().num_seconds();

    Ok(Json(LoginResponse {
        token: outcome.token.token,
        token_type: "Bearer".to_string(),
        expires_in,
        user: AccountResponse::from(outcome.account),
    }))
}

// ============================================
// Authenticated Account
// ============================================

/// POST /api/auth/change-password
///
/// Replace the caller's credential
pub async fn change_password(
    State(auth): State<AuthState>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    auth.change_password(user.id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully.")))
}

/// GET /api/auth/me
///
/// Identity of the token bearer
pub async fn get_current_user(user: AuthUser) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(serde_json::json!({
        "user": {
            "id": user.id,
            "username": user.username
        }
    })))
}

/// GET /api/user/:id
///
/// Profile of the caller's own account
pub async fn get_user_profile(
    State(auth): State<AuthState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    if !user.owns(&id) {
        return Err(AuthError::Forbidden);
    }

    let account = auth
        .get_account(user.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(AccountResponse::from(account)))
}
