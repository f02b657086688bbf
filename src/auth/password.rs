use argon2::{
    password_hash::{PasswordHasher as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use subtle::ConstantTimeEq;
use tracing::error;

use crate::auth::error::AuthError;
use crate::config::PasswordConfig;

/// Salt used for the throwaway hash on unknown identifiers.
const DUMMY_SALT: &str = "AAAAAAAAAAAAAAAAAAAAAA";

/// Argon2id over an explicit per-user salt.
///
/// `hash` is deterministic for a given `(salt, plain)` and parameter set, so
/// verification recomputes the digest and compares in constant time.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(cfg: &PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "invalid argon2 params");
                AuthError::Hashing(e.to_string())
            })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, salt: &str, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::from_b64(salt).map_err(|e| {
            error!(error = %e, "argon2 salt decode error");
            AuthError::Hashing(e.to_string())
        })?;
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AuthError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    pub fn verify(&self, salt: &str, plain: &str, digest: &str) -> Result<bool, AuthError> {
        let candidate = self.hash(salt, plain)?;
        Ok(candidate.as_bytes().ct_eq(digest.as_bytes()).into())
    }

    /// Spend the same work as a real verification without a stored record.
    pub(crate) fn burn(&self, plain: &str) {
        let _ = self.hash(DUMMY_SALT, plain);
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    // Minimal cost so the suite stays fast.
    PasswordHasher::new(&PasswordConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}
