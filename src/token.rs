//! Session Token Service
//!
//! Issues and validates HS256-signed JWTs. The signing secret and policy
//! live in a [`SigningContext`] built once at startup; nothing here reads
//! the environment.
//!
//! Tokens are not revocable: a token stays valid until `exp` even if the
//! account's password changes or the account is removed.

use crate::config::AuthConfig;
use crate::error::{AuthError, TokenError};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable signing secret and token policy
#[derive(Clone)]
pub struct SigningContext {
    secret: Vec<u8>,
    issuer: String,
    audience: String,
    token_lifetime: Duration,
}

impl SigningContext {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        token_lifetime: Duration,
    ) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::Config("signing secret must not be empty".to_string()));
        }
        if token_lifetime <= Duration::zero() {
            return Err(AuthError::Config("token lifetime must be positive".to_string()));
        }

        Ok(Self {
            secret,
            issuer: issuer.into(),
            audience: audience.into(),
            token_lifetime,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let token_lifetime = Duration::try_minutes(config.token_lifetime_minutes)
            .ok_or_else(|| AuthError::Config("token lifetime is out of range".to_string()))?;

        Self::new(
            config.jwt_secret.as_bytes(),
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            token_lifetime,
        )
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn token_lifetime(&self) -> Duration {
        self.token_lifetime
    }
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}

/// JWT claims for session tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Account username
    pub username: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token service
pub struct TokenService {
    context: SigningContext,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Create a new token service
    pub fn new(context: SigningContext) -> Self {
        let encoding_key = EncodingKey::from_secret(&context.secret);
        let decoding_key = DecodingKey::from_secret(&context.secret);

        Self {
            context,
            encoding_key,
            decoding_key,
        }
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// Issue a token for an account
    pub fn issue(&self, subject_id: &str, username: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject_id, username, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        subject_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.context.token_lifetime)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: subject_id.to_string(),
            username: username.to_string(),
            iss: self.context.issuer.clone(),
            aud: self.context.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`
    ///
    /// Accepts only `iat <= now < exp`, with no clock-skew allowance.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.context.issuer]);
        validation.set_audience(&[&self.context.audience]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);
        validation.leeway = 0;
        // Lifetime is checked below against the caller's clock.
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        let now = now.timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if now < claims.iat {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(secret: &str) -> SigningContext {
        SigningContext::new(secret, "sumdash", "sumdash-app", Duration::minutes(60)).unwrap()
    }

    fn service() -> TokenService {
        TokenService::new(context("test-secret-that-is-long-enough-123"))
    }

    #[test]
    fn test_issue_then_validate() {
        let tokens = service();
        let issued = tokens.issue("507f1f77bcf86cd799439011", "alice").unwrap();
        let claims = tokens.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "507f1f77bcf86cd799439011");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iss, "sumdash");
        assert_eq!(claims.aud, "sumdash-app");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn test_token_has_three_parts() {
        let issued = service().issue("1", "bob").unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::minutes(90);
        let issued = tokens.issue_at("1", "alice", issued_at).unwrap();

        assert_eq!(tokens.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_boundary_has_no_leeway() {
        let tokens = service();
        let now = Utc::now();
        let issued = tokens.issue_at("1", "alice", now).unwrap();
        let lifetime = Duration::minutes(60);

        let just_before = now + lifetime - Duration::seconds(1);
        assert!(tokens.validate_at(&issued.token, just_before).is_ok());

        let at_expiry = now + lifetime;
        assert_eq!(
            tokens.validate_at(&issued.token, at_expiry),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_future_token_rejected() {
        let tokens = service();
        let now = Utc::now();
        let issued = tokens.issue_at("1", "alice", now + Duration::minutes(5)).unwrap();

        assert_eq!(
            tokens.validate_at(&issued.token, now),
            Err(TokenError::NotYetValid)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenService::new(context("one-secret"));
        let validator = TokenService::new(context("another-secret"));
        let issued = issuer.issue("1", "alice").unwrap();

        assert_eq!(
            validator.validate(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_issuer_and_audience_enforced() {
        let secret = "shared-secret";
        let other_issuer = TokenService::new(
            SigningContext::new(secret, "someone-else", "sumdash-app", Duration::minutes(60))
                .unwrap(),
        );
        let other_audience = TokenService::new(
            SigningContext::new(secret, "sumdash", "another-app", Duration::minutes(60)).unwrap(),
        );
        let validator = TokenService::new(context(secret));

        let token = other_issuer.issue("1", "alice").unwrap().token;
        assert_eq!(validator.validate(&token), Err(TokenError::IssuerMismatch));

        let token = other_audience.issue("1", "alice").unwrap().token;
        assert_eq!(validator.validate(&token), Err(TokenError::AudienceMismatch));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let issued = tokens.issue("1", "alice").unwrap();
        let forged = tokens.issue("2", "mallory").unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let forged_parts: Vec<&str> = forged.token.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(tokens.validate(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            service().validate("not-a-jwt"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_signing_context_rejects_bad_policy() {
        assert!(SigningContext::new("", "i", "a", Duration::minutes(5)).is_err());
        assert!(SigningContext::new("s", "i", "a", Duration::zero()).is_err());
    }

    #[test]
    fn test_from_config_rejects_out_of_range_lifetime() {
        let config = AuthConfig {
            jwt_secret: "secret".to_string(),
            jwt_issuer: "sumdash".to_string(),
            jwt_audience: "sumdash-app".to_string(),
            token_lifetime_minutes: i64::MAX,
            min_password_length: 8,
        };

        assert!(matches!(
            SigningContext::from_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_issue_with_unrepresentable_expiry_fails() {
        let tokens = service();
        let result = tokens.issue_at("1", "alice", DateTime::<Utc>::MAX_UTC);

        assert!(matches!(result, Err(TokenError::Signing(_))));
    }
}
