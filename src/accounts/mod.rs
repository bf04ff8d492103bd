use crate::state::AppState;
use axum::Router;

mod dto;
pub mod error;
pub mod handlers;
pub mod mail;
#[cfg(test)]
pub(crate) mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod tokens;

pub use dto::{LoginForm, MessageResponse, RegisterForm};

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}
