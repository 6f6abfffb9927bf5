//! Password hashing and verification using PBKDF2-HMAC-SHA256
//!
//! Stored credentials have the form `base64(salt).base64(key)`. The KDF
//! parameters are deployment constants and are not written into the stored
//! string, so the scheme a credential belongs to is recognised by its salt
//! length: 32-byte salts are current, 16-byte salts come from the retired
//! PBKDF2-HMAC-SHA1 / 10,000 iteration scheme, which is never computed here.

use crate::error::PasswordError;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Salt length in bytes (256 bits)
pub const SALT_LEN: usize = 32;

/// Derived key length in bytes (256 bits)
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count for newly hashed credentials
pub const ITERATIONS: u32 = 100_000;

const LEGACY_SALT_LEN: usize = 16;
const LEGACY_ITERATIONS: u32 = 10_000;

/// PRF used by the key derivation function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    HmacSha1,
    HmacSha256,
}

/// A parsed, salted password hash
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: Vec<u8>,
    hash: Vec<u8>,
    algorithm: KdfAlgorithm,
    iterations: u32,
}

impl Credential {
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn algorithm(&self) -> KdfAlgorithm {
        self.algorithm
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Whether this credential was produced by the retired SHA1 scheme
    pub fn is_legacy(&self) -> bool {
        self.algorithm == KdfAlgorithm::HmacSha1
    }

    /// Encode as `base64(salt).base64(hash)`
    pub fn encode(&self) -> String {
        format!("{}.{}", STANDARD.encode(&self.salt), STANDARD.encode(&self.hash))
    }

    /// Check a candidate password against this credential in constant time
    pub fn matches(&self, password: &str) -> Result<bool, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }
        if self.is_legacy() {
            return Err(PasswordError::UnsupportedScheme);
        }

        let candidate = derive_key(password, &self.salt);
        Ok(candidate.as_slice().ct_eq(self.hash.as_slice()).into())
    }
}

// Never print key material.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("algorithm", &self.algorithm)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl FromStr for Credential {
    type Err = PasswordError;

    fn from_str(stored: &str) -> Result<Self, Self::Err> {
        let mut parts = stored.split('.');
        let (salt_b64, hash_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(salt), Some(hash), None) if !salt.is_empty() && !hash.is_empty() => {
                (salt, hash)
            }
            _ => {
                return Err(PasswordError::InvalidFormat(
                    "expected exactly two dot-separated segments".to_string(),
                ))
            }
        };

        let salt = STANDARD
            .decode(salt_b64)
            .map_err(|e| PasswordError::InvalidFormat(format!("salt: {e}")))?;
        let hash = STANDARD
            .decode(hash_b64)
            .map_err(|e| PasswordError::InvalidFormat(format!("hash: {e}")))?;

        if hash.len() != KEY_LEN {
            return Err(PasswordError::InvalidFormat(format!(
                "hash must be {KEY_LEN} bytes, got {}",
                hash.len()
            )));
        }

        let (algorithm, iterations) = match salt.len() {
            SALT_LEN => (KdfAlgorithm::HmacSha256, ITERATIONS),
            LEGACY_SALT_LEN => (KdfAlgorithm::HmacSha1, LEGACY_ITERATIONS),
            n => {
                return Err(PasswordError::InvalidFormat(format!(
                    "unexpected salt length {n}"
                )))
            }
        };

        Ok(Self {
            salt,
            hash,
            algorithm,
            iterations,
        })
    }
}

/// Hash a password with a fresh random salt
///
/// # Returns
/// * `Ok(String)` - `base64(salt).base64(hash)`, suitable for storage
/// * `Err(PasswordError::EmptyPassword)` - before any hashing work is done
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }

    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let hash = derive_key(password, &salt).to_vec();

    Ok(Credential {
        salt,
        hash,
        algorithm: KdfAlgorithm::HmacSha256,
        iterations: ITERATIONS,
    }
    .encode())
}

/// Verify a password against a stored credential
///
/// # Returns
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - Stored value is malformed or uses a retired scheme
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let credential: Credential = stored.parse()?;
    credential.matches(password)
}

/// A well-formed credential that matches no password
///
/// Verifying against it costs the same as a real verification, which keeps
/// "unknown account" indistinguishable from "wrong password" by timing.
pub fn decoy_credential() -> String {
    let mut salt = vec![0u8; SALT_LEN];
    let mut hash = vec![0u8; KEY_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut hash);

    Credential {
        salt,
        hash,
        algorithm: KdfAlgorithm::HmacSha256,
        iterations: ITERATIONS,
    }
    .encode()
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("MySecurePassword123!").unwrap();
        assert!(verify_password("MySecurePassword123!", &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let first = hash_password("samepassword").unwrap();
        let second = hash_password("samepassword").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("samepassword", &first).unwrap());
        assert!(verify_password("samepassword", &second).unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert_eq!(hash_password(""), Err(PasswordError::EmptyPassword));

        let hash = hash_password("something").unwrap();
        assert_eq!(verify_password("", &hash), Err(PasswordError::EmptyPassword));
    }

    #[test]
    fn test_independent_recomputation() {
        let stored = hash_password("correct-horse-battery-staple").unwrap();
        let (salt_b64, hash_b64) = stored.split_once('.').unwrap();
        let salt = STANDARD.decode(salt_b64).unwrap();
        let hash = STANDARD.decode(hash_b64).unwrap();

        assert_eq!(salt.len(), 32);
        assert_eq!(hash.len(), 32);

        let mut expected = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            b"correct-horse-battery-staple",
            &salt,
            100_000,
            &mut expected,
        );
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_separator_count_enforced() {
        for stored in ["", "nodots", "a.b.c", ".", "abc.", ".abc"] {
            assert!(
                matches!(
                    verify_password("password", stored),
                    Err(PasswordError::InvalidFormat(_))
                ),
                "{stored:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result = verify_password("password", "not*base64.also*not");
        assert!(matches!(result, Err(PasswordError::InvalidFormat(_))));
    }

    #[test]
    fn test_legacy_credential_recognised() {
        let legacy = format!(
            "{}.{}",
            STANDARD.encode([7u8; LEGACY_SALT_LEN]),
            STANDARD.encode([9u8; KEY_LEN])
        );

        let credential: Credential = legacy.parse().unwrap();
        assert!(credential.is_legacy());
        assert_eq!(credential.algorithm(), KdfAlgorithm::HmacSha1);
        assert_eq!(credential.iterations(), 10_000);
        assert_eq!(
            verify_password("anything", &legacy),
            Err(PasswordError::UnsupportedScheme)
        );
    }

    #[test]
    fn test_decoy_is_well_formed() {
        let decoy = decoy_credential();
        assert!(!verify_password("anything", &decoy).unwrap());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let credential: Credential = hash_password("hunter22").unwrap().parse().unwrap();
        let printed = format!("{credential:?}");
        assert!(!printed.contains(&STANDARD.encode(credential.hash())));
        assert!(printed.contains("HmacSha256"));
    }
}
