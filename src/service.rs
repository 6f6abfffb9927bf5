//! Authentication Service
//!
//! Signup, login and password change, composed from the password hasher,
//! the token service and an [`AccountDirectory`].

use crate::config::AuthConfig;
use crate::directory::AccountDirectory;
use crate::error::{AuthError, PasswordError};
use crate::models::{Account, NewAccount};
use crate::password;
use crate::token::{IssuedToken, TokenService};

use std::sync::Arc;
use uuid::Uuid;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: IssuedToken,
}

/// Authentication service
pub struct AuthService {
    directory: Arc<dyn AccountDirectory>,
    tokens: Arc<TokenService>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        tokens: Arc<TokenService>,
        config: AuthConfig,
    ) -> Self {
        Self {
            directory,
            tokens,
            config,
        }
    }

    /// Get reference to the account directory
    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    /// Get reference to the token service
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ============================================
    // Password Helpers
    // ============================================

    /// Validate password policy
    pub fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        if password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword);
        }
        Ok(())
    }

    /// Hash a password off the async runtime
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let hash = run_blocking(move || password::hash_password(&password)).await??;
        Ok(hash)
    }

    /// Verify a password off the async runtime
    ///
    /// The outer error is a task failure; the inner result is the verdict.
    async fn verify_password(
        &self,
        password: &str,
        stored: &str,
    ) -> Result<Result<bool, PasswordError>, AuthError> {
        let password = password.to_string();
        let stored = stored.to_string();
        run_blocking(move || password::verify_password(&password, &stored)).await
    }

    /// Check a login credential, mapping every failure to `Unauthenticated`
    async fn check_credential(&self, account: &Account, password: &str) -> Result<(), AuthError> {
        match self.verify_password(password, &account.password_hash).await? {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::Unauthenticated),
            Err(PasswordError::UnsupportedScheme) => {
                tracing::warn!(
                    user_id = %account.id,
                    "Stored credential uses the retired SHA1 scheme; password reset required"
                );
                Err(AuthError::Unauthenticated)
            }
            Err(PasswordError::EmptyPassword) => Err(AuthError::EmptyPassword),
            Err(PasswordError::InvalidFormat(reason)) => {
                tracing::error!(user_id = %account.id, "Stored credential is malformed: {}", reason);
                Err(AuthError::Unauthenticated)
            }
        }
    }

    // ============================================
    // Signup
    // ============================================

    /// Register a new account
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        // Rejected before any hashing work
        self.validate_password(password)?;

        if self.directory.find_by_username(username).await?.is_some() {
            return Err(AuthError::AccountExists("username"));
        }
        if self.directory.find_by_email(email).await?.is_some() {
            return Err(AuthError::AccountExists("email"));
        }

        let password_hash = self.hash_password(password).await?;

        let account = self
            .directory
            .create(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %account.id, "Account created");
        Ok(account)
    }

    // ============================================
    // Login
    // ============================================

    /// Authenticate by email or username and issue a session token
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let account = match self.directory.find_by_email(identifier).await? {
            Some(account) => Some(account),
            None => self.directory.find_by_username(identifier).await?,
        };

        let account = match account {
            Some(account) => account,
            None => {
                // Same work as a real check so the miss is not observable.
                let _ = self
                    .verify_password(password, &password::decoy_credential())
                    .await?;
                return Err(AuthError::Unauthenticated);
            }
        };

        self.check_credential(&account, password).await?;

        let token = self
            .tokens
            .issue(&account.id.to_string(), &account.username)?;

        tracing::info!(user_id = %account.id, "Login successful");
        Ok(LoginOutcome { account, token })
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change password for an authenticated account
    ///
    /// Tokens issued before the change stay valid until they expire.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .directory
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.check_credential(&account, current_password).await?;
        self.validate_password(new_password)?;

        let password_hash = self.hash_password(new_password).await?;
        self.directory
            .update_credential(account.id, &password_hash)
            .await?;

        tracing::info!(user_id = %account.id, "Password changed");
        Ok(())
    }

    /// Get account by ID
    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, AuthError> {
        Ok(self.directory.find_by_id(account_id).await?)
    }
}

/// Run CPU-bound key derivation on the blocking pool
///
/// A panicked or cancelled task is an internal error, never a verdict.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Blocking password task failed: {}", e);
        AuthError::Internal
    })
}
