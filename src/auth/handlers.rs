use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{ErrorBody, LoginRequest, PublicUser, SessionResponse},
        error::AuthError,
        extractors::SessionUser,
        input::DEFAULT_UNPROTECTED_FIELDS,
    },
    state::AppState,
};

type HandlerError = (StatusCode, Json<ErrorBody>);

fn internal(e: AuthError) -> HandlerError {
    error!(error = %e, "account operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::message("internal error")),
    )
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(login).delete(logout))
        .route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<PublicUser>), HandlerError> {
    let mut user = state
        .accounts
        .user_from_input(&payload, DEFAULT_UNPROTECTED_FIELDS);

    match state.accounts.save(&mut user).await {
        Ok(()) => {
            info!(user_id = %user.id, "user registered");
            Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
        }
        Err(AuthError::Invalid(fields)) => {
            warn!(errors = %fields, "registration rejected");
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: "Invalid user".into(),
                    fields,
                }),
            ))
        }
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let identifier = payload.login.trim();

    let mut user = match state.accounts.authenticate(identifier, &payload.password).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::message("Invalid credentials")),
            ))
        }
        Err(e) => return Err(internal(e)),
    };

    let session = if payload.remember {
        Some(state.accounts.remember(&mut user).await.map_err(internal)?)
    } else {
        None
    };

    info!(user_id = %user.id, remember = payload.remember, "user logged in");
    Ok(Json(SessionResponse {
        user: PublicUser::from(&user),
        session,
    }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    SessionUser(mut user): SessionUser,
) -> Result<StatusCode, HandlerError> {
    state.accounts.forget(&mut user).await.map_err(internal)?;
    info!(user_id = %user.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn get_me(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{Role, User, UserField};
    use crate::auth::validation::MSG_LOGIN_TAKEN;
    use crate::state::testing::state;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn registration() -> Map<String, Value> {
        object(json!({
            "name": "Existing",
            "login": "existing",
            "email": "existing@example.com",
            "password": "password",
            "password_confirmation": "password",
            "admin": true,
        }))
    }

    fn login_request(login: &str, password: &str, remember: bool) -> LoginRequest {
        LoginRequest {
            login: login.into(),
            password: password.into(),
            remember,
        }
    }

    #[tokio::test]
    async fn register_ignores_protected_fields() {
        let state = state();
        let (status, Json(user)) = register(State(state.clone()), Json(registration()))
            .await
            .expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.login.as_deref(), Some("existing"));
        assert!(!user.roles.contains(&Role::Admin));
    }

    #[tokio::test]
    async fn register_reports_field_errors() {
        let state = state();
        register(State(state.clone()), Json(registration()))
            .await
            .expect("register");

        let (status, Json(body)) = register(State(state), Json(registration()))
            .await
            .expect_err("duplicate login");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.fields.on(UserField::Login), vec![MSG_LOGIN_TAKEN]);
    }

    #[tokio::test]
    async fn login_remember_then_logout() {
        let state = state();
        register(State(state.clone()), Json(registration()))
            .await
            .expect("register");

        let Json(resp) = login(
            State(state.clone()),
            Json(login_request("existing@example.com", "password", true)),
        )
        .await
        .expect("login");
        let session = resp.session.expect("remembered");
        assert!(!session.token.is_empty());

        let user = state
            .accounts
            .resume(&session.token)
            .await
            .expect("resume")
            .expect("live session");
        let status = logout(State(state.clone()), SessionUser(user))
            .await
            .expect("logout");
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state
            .accounts
            .resume(&session.token)
            .await
            .expect("resume")
            .is_none());
    }

    #[tokio::test]
    async fn login_without_remember_issues_no_token() {
        let state = state();
        register(State(state.clone()), Json(registration()))
            .await
            .expect("register");
        let Json(resp) = login(
            State(state),
            Json(login_request("existing", "password", false)),
        )
        .await
        .expect("login");
        assert!(resp.session.is_none());
        let json = serde_json::to_string(&resp).expect("serialize");
        assert!(!json.contains("session"));
    }

    #[tokio::test]
    async fn failed_logins_look_the_same() {
        let state = state();
        register(State(state.clone()), Json(registration()))
            .await
            .expect("register");

        let (s1, Json(b1)) = login(
            State(state.clone()),
            Json(login_request("existing", "bad password", false)),
        )
        .await
        .expect_err("bad password");
        let (s2, Json(b2)) = login(
            State(state),
            Json(login_request("nonexisting", "password", false)),
        )
        .await
        .expect_err("bad user");
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(b1.error, b2.error);
    }

    #[tokio::test]
    async fn blank_logins_register_and_never_sign_in() {
        let state = state();
        for name in ["First", "Second"] {
            let mut body = registration();
            body.insert("name".into(), json!(name));
            body.insert("login".into(), json!("   "));
            body.insert("email".into(), json!(""));
            let (status, Json(user)) = register(State(state.clone()), Json(body))
                .await
                .expect("register");
            assert_eq!(status, StatusCode::CREATED);
            assert!(user.login.is_none());
        }

        let (status, _) = login(State(state), Json(login_request("  ", "password", false)))
            .await
            .expect_err("blank login");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn public_user_serialization_hides_secrets() {
        let mut user = User::new("Designer", time::OffsetDateTime::UNIX_EPOCH);
        user.roles.designer = true;
        user.salt = Some("c29tZXNhbHRzb21lc2FsdA".into());
        let json = serde_json::to_string(&PublicUser::from(&user)).expect("serialize");
        assert!(json.contains("\"designer\""));
        assert!(!json.contains("salt"));
        assert!(!json.contains("c29tZXNhbHRzb21lc2FsdA"));
    }
}
