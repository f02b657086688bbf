use serde::Serialize;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::auth::{error::AuthError, random::generate_token, repo_types::User, services::Accounts};

/// What the transport hands to the client for a remembered session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RememberToken {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Accounts {
    /// Issues a fresh remember-me token, replacing any previous one.
    ///
    /// Only the token columns and `updated_at` are written; the record is not
    /// re-validated and other unsaved edits on `user` stay unsaved.
    pub async fn remember(&self, user: &mut User) -> Result<RememberToken, AuthError> {
        let token = generate_token(self.random.as_ref())?;
        let now = self.clock.now();
        let expires_at = now + self.settings.session_timeout();

        let mut candidate = user.clone();
        candidate.session_token = Some(token.clone());
        candidate.session_token_expires_at = Some(expires_at);
        candidate.updated_at = now;
        self.persist(&candidate).await?;
        *user = candidate;

        info!(user_id = %user.id, %expires_at, "session remembered");
        Ok(RememberToken { token, expires_at })
    }

    /// Clears the remember-me token and its expiry. Like `remember`, other
    /// unsaved edits on `user` are not persisted.
    pub async fn forget(&self, user: &mut User) -> Result<(), AuthError> {
        let mut candidate = user.clone();
        candidate.clear_session();
        candidate.updated_at = self.clock.now();
        self.persist(&candidate).await?;
        *user = candidate;

        info!(user_id = %user.id, "session forgotten");
        Ok(())
    }

    /// Returns the user holding `token` while it has not expired.
    ///
    /// Unknown, forgotten and expired tokens all yield `Ok(None)`.
    pub async fn resume(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let Some(user) = self.store.find_by_session_token(token).await? else {
            debug!("unknown session token");
            return Ok(None);
        };

        let matches = user
            .session_token
            .as_deref()
            .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(token.as_bytes())));
        let live = user
            .session_token_expires_at
            .is_some_and(|expires_at| self.clock.now() < expires_at);

        if !(matches && live) {
            debug!(user_id = %user.id, "session token expired");
            return Ok(None);
        }
        Ok(Some(user))
    }

    async fn persist(&self, user: &User) -> Result<(), AuthError> {
        self.store.save_session(user).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "save session failed");
            AuthError::Storage(e)
        })
    }
}
