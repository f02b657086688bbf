use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use tracing::{error, warn};

use super::dto::ErrorBody;
use super::repo_types::User;
use crate::state::AppState;

/// Resolves a remember-me bearer token to its user.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized =
            |msg: &str| (StatusCode::UNAUTHORIZED, Json(ErrorBody::message(msg)));

        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| unauthorized("missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| unauthorized("invalid auth scheme"))?;

        match state.accounts.resume(token.trim()).await {
            Ok(Some(user)) => Ok(SessionUser(user)),
            Ok(None) => {
                warn!("invalid or expired session token");
                Err(unauthorized("invalid or expired session"))
            }
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::message("internal error")),
                ))
            }
        }
    }
}
