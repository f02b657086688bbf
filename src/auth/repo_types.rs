use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Coarse-grained capabilities a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Designer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Designer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Designer => "designer",
        }
    }

    /// Unknown names yield `None`, never an error.
    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

/// Role columns of the user row. Unset means false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct RoleFlags {
    pub admin: bool,
    pub designer: bool,
}

impl RoleFlags {
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.admin,
            Role::Designer => self.designer,
        }
    }

    pub fn set(&mut self, role: Role, value: bool) {
        match role {
            Role::Admin => self.admin = value,
            Role::Designer => self.designer = value,
        }
    }

    pub fn granted(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| self.get(*r)).collect()
    }
}

/// Fields a caller may assign from external input, and the keys validation
/// errors are reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    Name,
    Email,
    Login,
    Password,
    PasswordConfirmation,
    Locale,
}

impl UserField {
    pub fn as_str(self) -> &'static str {
        match self {
            UserField::Name => "name",
            UserField::Email => "email",
            UserField::Login => "login",
            UserField::Password => "password",
            UserField::PasswordConfirmation => "password_confirmation",
            UserField::Locale => "locale",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record in the database.
///
/// `password` and `password_confirmation` are transient inputs: they are never
/// read from or written to storage and are cleared after a successful save.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub login: Option<String>,
    pub locale: Option<String>,
    #[sqlx(skip)]
    pub password: Option<String>,
    #[sqlx(skip)]
    pub password_confirmation: Option<String>,
    pub password_digest: Option<String>,
    pub salt: Option<String>,
    pub session_token: Option<String>,
    pub session_token_expires_at: Option<OffsetDateTime>,
    #[sqlx(flatten)]
    pub roles: RoleFlags,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn new(name: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            login: None,
            locale: None,
            password: None,
            password_confirmation: None,
            password_digest: None,
            salt: None,
            session_token: None,
            session_token_expires_at: None,
            roles: RoleFlags::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets both transient password fields to the same value.
    pub fn set_password(&mut self, plain: impl Into<String>) {
        let plain = plain.into();
        self.password_confirmation = Some(plain.clone());
        self.password = Some(plain);
    }

    pub fn has_role(&self, name: &str) -> bool {
        Role::from_name(name).is_some_and(|role| self.roles.get(role))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.admin
    }

    pub fn is_designer(&self) -> bool {
        self.roles.designer
    }

    /// Whitespace-only `login` and `email` are stored as absent.
    pub(crate) fn normalize_blanks(&mut self) {
        for field in [&mut self.login, &mut self.email] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }

    pub(crate) fn clear_session(&mut self) {
        self.session_token = None;
        self.session_token_expires_at = None;
    }
}

// Secrets stay out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("login", &self.login)
            .field("locale", &self.locale)
            .field("remembered", &self.session_token.is_some())
            .field("session_token_expires_at", &self.session_token_expires_at)
            .field("roles", &self.roles)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}
