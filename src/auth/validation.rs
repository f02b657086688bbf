use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::auth::repo_types::{User, UserField};

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const LOGIN_MIN: usize = 3;
pub const LOGIN_MAX: usize = 40;
pub const PASSWORD_MIN: usize = 5;
pub const PASSWORD_MAX: usize = 40;

pub const MSG_BLANK: &str = "must not be blank";
pub const MSG_NAME_TOO_LONG: &str = "must not be longer than 100 characters";
pub const MSG_EMAIL_TOO_LONG: &str = "must not be longer than 255 characters";
pub const MSG_EMAIL_FORMAT: &str = "is not a valid e-mail address";
pub const MSG_LOGIN_LENGTH: &str = "must be between 3 and 40 characters long";
pub const MSG_LOGIN_TAKEN: &str = "is already in use";
pub const MSG_PASSWORD_TOO_SHORT: &str = "must be at least 5 characters long";
pub const MSG_PASSWORD_TOO_LONG: &str = "must not be longer than 40 characters";
pub const MSG_PASSWORD_CONFIRMATION: &str = "must match confirmation";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"(?i)^[^@\s]+@([-a-z0-9]+\.)+[a-z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: UserField,
    pub message: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Every rule failure found on a candidate record, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn add(&mut self, field: UserField, message: &'static str) {
        self.0.push(ValidationError { field, message });
    }

    /// Messages recorded against `field`.
    pub fn on(&self, field: UserField) -> Vec<&'static str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
            first = false;
        }
        Ok(())
    }
}

/// Rules that only look at the record itself. Login uniqueness needs storage
/// and is added by `Accounts::validate`.
pub fn validate_fields(user: &User) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if user.name.trim().is_empty() {
        errors.add(UserField::Name, MSG_BLANK);
    }
    if user.name.chars().count() > NAME_MAX {
        errors.add(UserField::Name, MSG_NAME_TOO_LONG);
    }

    if let Some(email) = user.email.as_deref().filter(|e| !e.trim().is_empty()) {
        if email.chars().count() > EMAIL_MAX {
            errors.add(UserField::Email, MSG_EMAIL_TOO_LONG);
        }
        if !is_valid_email(email) {
            errors.add(UserField::Email, MSG_EMAIL_FORMAT);
        }
    }

    if let Some(login) = user.login.as_deref().filter(|l| !l.trim().is_empty()) {
        let len = login.chars().count();
        if !(LOGIN_MIN..=LOGIN_MAX).contains(&len) {
            errors.add(UserField::Login, MSG_LOGIN_LENGTH);
        }
    }

    // An empty password means "keep the current digest".
    if let Some(password) = user.password.as_deref().filter(|p| !p.is_empty()) {
        let len = password.chars().count();
        if len < PASSWORD_MIN {
            errors.add(UserField::Password, MSG_PASSWORD_TOO_SHORT);
        }
        if len > PASSWORD_MAX {
            errors.add(UserField::Password, MSG_PASSWORD_TOO_LONG);
        }
        if user.password_confirmation.as_deref() != Some(password) {
            errors.add(UserField::Password, MSG_PASSWORD_CONFIRMATION);
        }
    }

    errors
}
