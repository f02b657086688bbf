use thiserror::Error;

use crate::auth::validation::ValidationErrors;

/// Failures of the account operations.
///
/// A rejected login is not an error: `authenticate` and `resume` return
/// `Ok(None)` for both unknown identifiers and wrong secrets.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user record is invalid: {0}")]
    Invalid(ValidationErrors),
    #[error("random source failed: {0}")]
    Randomness(#[from] rand::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("user storage failed: {0}")]
    Storage(#[from] anyhow::Error),
}
