use argon2::password_hash::SaltString;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

use crate::auth::error::AuthError;

/// Raw salt length before B64 encoding.
const SALT_BYTES: usize = 16;

/// Remember-me token length before encoding (43 chars once encoded).
const TOKEN_BYTES: usize = 32;

/// Cryptographically strong byte source. Failures must abort the caller.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

pub(crate) fn generate_salt(random: &dyn RandomSource) -> Result<String, AuthError> {
    let mut buf = [0u8; SALT_BYTES];
    random.fill_bytes(&mut buf)?;
    let salt = SaltString::encode_b64(&buf).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(salt.as_str().to_owned())
}

pub(crate) fn generate_token(random: &dyn RandomSource) -> Result<String, AuthError> {
    let mut buf = [0u8; TOKEN_BYTES];
    random.fill_bytes(&mut buf)?;
    Ok(Base64UrlUnpadded::encode_string(&buf))
}
