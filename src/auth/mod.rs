use crate::state::AppState;
use axum::Router;

pub mod cookie;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod mailer;
pub mod password;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
