use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod input;
pub mod password;
pub mod random;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;
pub mod validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::session_routes())
}
