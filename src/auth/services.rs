use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::auth::{
    error::AuthError,
    password::PasswordHasher,
    random::{generate_salt, RandomSource},
    repo::UserStore,
    repo_types::{User, UserField},
    validation::{validate_fields, ValidationErrors, MSG_LOGIN_TAKEN},
};
use crate::clock::Clock;
use crate::config::SessionSettings;

/// Account operations over the injected collaborators.
pub struct Accounts {
    pub(crate) store: Arc<dyn UserStore>,
    pub(crate) hasher: PasswordHasher,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) settings: Arc<dyn SessionSettings>,
}

impl Accounts {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        settings: Arc<dyn SessionSettings>,
    ) -> Self {
        Self {
            store,
            hasher,
            clock,
            random,
            settings,
        }
    }

    /// A blank record stamped with the injected clock.
    pub fn new_user(&self, name: impl Into<String>) -> User {
        User::new(name, self.clock.now())
    }

    /// Builds a record from untrusted input, assigning only `mask`.
    pub fn user_from_input(&self, input: &Map<String, Value>, mask: &[UserField]) -> User {
        User::from_input(input, mask, self.clock.now())
    }

    /// All field rules plus login uniqueness against other stored records.
    pub async fn validate(&self, user: &User) -> Result<ValidationErrors, AuthError> {
        let mut errors = validate_fields(user);
        if let Some(login) = user.login.as_deref().filter(|l| !l.trim().is_empty()) {
            if let Some(holder) = self.store.find_by_login(login).await? {
                if holder.id != user.id {
                    errors.add(UserField::Login, MSG_LOGIN_TAKEN);
                }
            }
        }
        Ok(errors)
    }

    /// Validates, encrypts a newly supplied password and persists.
    ///
    /// Whitespace-only `login` and `email` are stored as absent. On any
    /// failure `user` is left exactly as it was passed in. On success the
    /// transient password fields are cleared.
    pub async fn save(&self, user: &mut User) -> Result<(), AuthError> {
        let mut candidate = user.clone();
        candidate.normalize_blanks();

        let errors = self.validate(&candidate).await?;
        if !errors.is_empty() {
            warn!(user_id = %user.id, errors = %errors, "user failed validation");
            return Err(AuthError::Invalid(errors));
        }

        self.encrypt_password(&mut candidate)?;
        candidate.updated_at = self.clock.now();
        self.store.save(&candidate).await.map_err(|e| {
            error!(error = %e, user_id = %candidate.id, "save user failed");
            AuthError::Storage(e)
        })?;

        candidate.password = None;
        candidate.password_confirmation = None;
        *user = candidate;
        info!(user_id = %user.id, "user saved");
        Ok(())
    }

    /// Derives the digest from the supplied plaintext.
    ///
    /// A blank plaintext keeps the existing digest; a record that was never
    /// encrypted gets the digest of the empty string. The salt is generated
    /// on first use and then reused forever.
    pub(crate) fn encrypt_password(&self, user: &mut User) -> Result<(), AuthError> {
        let plain = match user.password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ if user.password_digest.is_some() => return Ok(()),
            _ => "",
        };
        let salt = match &user.salt {
            Some(salt) => salt.clone(),
            None => generate_salt(self.random.as_ref())?,
        };
        let digest = self.hasher.hash(&salt, plain)?;
        user.salt = Some(salt);
        user.password_digest = Some(digest);
        debug!(user_id = %user.id, "password encrypted");
        Ok(())
    }

    /// Looks up by login or e-mail and verifies the password.
    ///
    /// Unknown or blank identifiers and wrong passwords all yield `Ok(None)`.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        if identifier.trim().is_empty() {
            self.hasher.burn(password);
            warn!("authentication rejected");
            return Ok(None);
        }
        let Some(user) = self.store.find_by_login_or_email(identifier).await? else {
            self.hasher.burn(password);
            warn!("authentication rejected");
            return Ok(None);
        };

        let verified = match (user.salt.as_deref(), user.password_digest.as_deref()) {
            (Some(salt), Some(digest)) => {
                self.hasher.verify(salt, password, digest).unwrap_or_else(|e| {
                    error!(error = %e, user_id = %user.id, "stored credential unreadable");
                    false
                })
            }
            _ => {
                self.hasher.burn(password);
                false
            }
        };

        if !verified {
            warn!("authentication rejected");
            return Ok(None);
        }
        info!(user_id = %user.id, "user authenticated");
        Ok(Some(user))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::auth::random::testing::BrokenRandom;
    use crate::auth::validation::{MSG_BLANK, MSG_PASSWORD_CONFIRMATION};

    #[tokio::test]
    async fn saves_password_encrypted() {
        let (accounts, store) = accounts();
        let mut user = user_params(&accounts);
        user.set_password("test_password");
        accounts.save(&mut user).await.expect("save");

        let salt = user.salt.clone().expect("salt");
        let expected = accounts.hasher.hash(&salt, "test_password").expect("hash");
        assert_eq!(user.password_digest.as_deref(), Some(expected.as_str()));
        assert!(user.password.is_none());

        let stored = store.load(user.id).await.expect("load").expect("some");
        assert_eq!(stored.password_digest, user.password_digest);
    }

    #[tokio::test]
    async fn empty_password_keeps_existing_digest() {
        let (accounts, _) = accounts();
        let mut user = user_params(&accounts);
        accounts.save(&mut user).await.expect("save");
        let digest = user.password_digest.clone();

        user.set_password("");
        accounts.save(&mut user).await.expect("resave");
        assert_eq!(user.password_digest, digest);
        let salt = user.salt.clone().expect("salt");
        assert!(accounts
            .hasher
            .verify(&salt, "password", user.password_digest.as_deref().expect("digest"))
            .expect("verify"));
    }

    #[tokio::test]
    async fn different_password_rehashes_with_same_salt() {
        let (accounts, _) = accounts();
        let mut user = user_params(&accounts);
        accounts.save(&mut user).await.expect("save");
        let salt = user.salt.clone();

        user.set_password("cool beans");
        accounts.save(&mut user).await.expect("resave");
        assert_eq!(user.salt, salt);
        let expected = accounts
            .hasher
            .hash(salt.as_deref().expect("salt"), "cool beans")
            .expect("hash");
        assert_eq!(user.password_digest.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn same_password_twice_is_stable() {
        let (accounts, _) = accounts();
        let mut user = user_params(&accounts);
        accounts.save(&mut user).await.expect("save");
        let first = (user.salt.clone(), user.password_digest.clone());

        user.set_password("password");
        accounts.save(&mut user).await.expect("resave");
        accounts.save(&mut user).await.expect("resave again");
        assert_eq!((user.salt.clone(), user.password_digest.clone()), first);
    }

    #[tokio::test]
    async fn encrypt_creates_salt_once() {
        let (accounts, _) = accounts();
        let mut user = user_params(&accounts);
        assert!(user.salt.is_none());
        accounts.encrypt_password(&mut user).expect("encrypt");
        let salt = user.salt.clone().expect("salt");
        let expected = accounts.hasher.hash(&salt, "password").expect("hash");
        assert_eq!(user.password_digest.as_deref(), Some(expected.as_str()));

        user.set_password("another one");
        accounts.encrypt_password(&mut user).expect("encrypt");
        assert_eq!(user.salt.as_deref(), Some(salt.as_str()));
    }

    #[tokio::test]
    async fn first_save_with_empty_password_hashes_empty_string() {
        let (accounts, _) = accounts();
        let mut user = accounts.new_user("No Password");
        accounts.save(&mut user).await.expect("save");
        let salt = user.salt.clone().expect("salt");
        assert!(accounts
            .hasher
            .verify(&salt, "", user.password_digest.as_deref().expect("digest"))
            .expect("verify"));
    }

    #[tokio::test]
    async fn invalid_record_is_not_saved() {
        let (accounts, store) = accounts();
        let mut user = user_params(&accounts);
        user.name.clear();
        user.password_confirmation = Some("nope".into());

        let errors = match accounts.save(&mut user).await {
            Err(AuthError::Invalid(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        };
        assert_eq!(errors.on(UserField::Name), vec![MSG_BLANK]);
        assert_eq!(errors.on(UserField::Password), vec![MSG_PASSWORD_CONFIRMATION]);
        assert!(store.is_empty().await);
        assert!(user.salt.is_none());
        assert_eq!(user.password.as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn login_uniqueness_excludes_self() {
        let (accounts, _) = accounts();
        let mut existing = seed(&accounts, "existing", &[]).await;

        existing.name = "Renamed".into();
        accounts.save(&mut existing).await.expect("resave unchanged login");

        let mut other = user_params(&accounts);
        other.login = Some("existing".into());
        let errors = accounts.validate(&other).await.expect("validate");
        assert_eq!(errors.on(UserField::Login), vec![MSG_LOGIN_TAKEN]);
    }

    #[tokio::test]
    async fn randomness_failure_aborts_save() {
        let (accounts, store) = accounts_with(Arc::new(BrokenRandom));
        let mut user = user_params(&accounts);
        let err = accounts.save(&mut user).await.unwrap_err();
        assert!(matches!(err, AuthError::Randomness(_)));
        assert!(user.salt.is_none());
        assert!(user.password_digest.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn authenticates_by_login_and_email() {
        let (accounts, _) = accounts();
        let expected = seed(&accounts, "existing", &[]).await;

        let by_login = accounts
            .authenticate("existing", "password")
            .await
            .expect("authenticate");
        assert_eq!(by_login, Some(expected.clone()));

        let by_email = accounts
            .authenticate("existing@example.com", "password")
            .await
            .expect("authenticate");
        assert_eq!(by_email, Some(expected));
    }

    #[tokio::test]
    async fn rejections_are_indistinguishable() {
        let (accounts, _) = accounts();
        seed(&accounts, "existing", &[]).await;

        let bad_password = accounts
            .authenticate("existing", "bad password")
            .await
            .expect("authenticate");
        let bad_user = accounts
            .authenticate("nonexisting", "password")
            .await
            .expect("authenticate");
        assert!(bad_password.is_none());
        assert!(bad_user.is_none());
    }

    #[tokio::test]
    async fn whitespace_logins_are_stored_as_absent() {
        let (accounts, store) = accounts();
        let mut a = user_params(&accounts);
        a.login = Some("   ".into());
        a.email = Some(" ".into());
        let mut b = user_params(&accounts);
        b.login = Some("   ".into());

        assert!(accounts.validate(&b).await.expect("validate").is_empty());
        accounts.save(&mut a).await.expect("save a");
        accounts.save(&mut b).await.expect("save b");
        assert!(a.login.is_none());
        assert!(a.email.is_none());
        assert!(b.login.is_none());
        assert_eq!(store.len().await, 2);
        let stored = store.load(b.id).await.expect("load").expect("some");
        assert!(stored.login.is_none());
    }

    #[tokio::test]
    async fn blank_identifier_never_authenticates() {
        let (accounts, store) = accounts();
        let mut user = user_params(&accounts);
        user.login = Some(String::new());
        user.email = Some(String::new());
        accounts.save(&mut user).await.expect("save");

        // Even a record that reached storage with blank keys stays unreachable.
        let mut raw = user.clone();
        raw.login = Some(String::new());
        raw.email = Some(String::new());
        store.save(&raw).await.expect("raw save");

        for identifier in ["", "   "] {
            let found = accounts
                .authenticate(identifier, "password")
                .await
                .expect("authenticate");
            assert!(found.is_none(), "{identifier:?}");
        }
    }

    #[tokio::test]
    async fn seeded_roles() {
        let (accounts, _) = accounts();
        let existing = seed(&accounts, "existing", &[]).await;
        let designer = seed(&accounts, "designer", &[crate::Role::Designer]).await;
        let admin = seed(&accounts, "admin", &[crate::Role::Admin]).await;

        assert!(!existing.has_role("foo"));
        assert!(!existing.has_role("designer"));
        assert!(!existing.has_role("admin"));
        assert!(designer.has_role("designer"));
        assert!(admin.has_role("admin"));
    }
}
