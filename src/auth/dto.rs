use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{
    repo_types::{Role, User},
    session::RememberToken,
    validation::ValidationErrors,
};

/// Request body for login. `login` may hold either the login or the e-mail.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<RememberToken>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub login: Option<String>,
    pub locale: Option<String>,
    pub roles: Vec<Role>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            login: user.login.clone(),
            locale: user.locale.clone(),
            roles: user.roles.granted(),
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    pub fields: ValidationErrors,
}

impl ErrorBody {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: ValidationErrors::default(),
        }
    }
}
