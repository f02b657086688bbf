use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::debug;

use crate::auth::repo_types::{User, UserField};

/// Fields assignable from untrusted input unless the caller says otherwise.
pub const DEFAULT_UNPROTECTED_FIELDS: &[UserField] = &[
    UserField::Name,
    UserField::Email,
    UserField::Login,
    UserField::Password,
    UserField::PasswordConfirmation,
    UserField::Locale,
];

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl User {
    /// Builds a record from an untrusted JSON object, copying only `mask`.
    pub fn from_input(input: &Map<String, Value>, mask: &[UserField], now: OffsetDateTime) -> Self {
        let mut user = User::new(String::new(), now);
        user.assign_input(input, mask);
        user
    }

    /// Overwrites the masked fields present in `input`; everything else,
    /// including role flags and stored credentials, is left alone.
    pub fn assign_input(&mut self, input: &Map<String, Value>, mask: &[UserField]) {
        for field in mask {
            let Some(value) = input.get(field.as_str()) else {
                continue;
            };
            let text = as_text(value);
            match field {
                UserField::Name => self.name = text.unwrap_or_default(),
                UserField::Email => self.email = text,
                UserField::Login => self.login = text,
                UserField::Password => self.password = text,
                UserField::PasswordConfirmation => self.password_confirmation = text,
                UserField::Locale => self.locale = text,
            }
        }
        let ignored: Vec<&str> = input
            .keys()
            .filter(|k| !mask.iter().any(|f| f.as_str() == k.as_str()))
            .map(String::as_str)
            .collect();
        if !ignored.is_empty() {
            debug!(?ignored, "ignoring protected user attributes");
        }
    }
}
