//! User authentication and authorization: identity validation, salted
//! password digests, remember-me session tokens and role checks.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod state;

pub use auth::{
    error::AuthError,
    input::DEFAULT_UNPROTECTED_FIELDS,
    password::PasswordHasher,
    random::{OsRandom, RandomSource},
    repo::{MemoryUserStore, PgUserStore, UserStore},
    repo_types::{Role, RoleFlags, User, UserField},
    services::Accounts,
    session::RememberToken,
    validation::{validate_fields, ValidationError, ValidationErrors},
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, SessionSettings};
