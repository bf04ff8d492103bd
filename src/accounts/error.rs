use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use super::dto::MessageResponse;
use super::mail::MailError;

/// Failures reported by a [`UserStore`](super::repo::UserStore).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("nickname already claimed")]
    NicknameTaken,

    #[error("email already registered")]
    EmailTaken,

    #[error("user not found")]
    NotFound,

    #[error("table store error: {0}")]
    Backend(String),
}

/// Errors surfaced by the account endpoints.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("Nickname already exists.")]
    NicknameTaken,

    #[error("Email already exists.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Please confirm your email.")]
    EmailNotConfirmed,

    #[error("The confirmation link is invalid or has expired.")]
    InvalidOrExpiredToken,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NicknameTaken => AccountError::NicknameTaken,
            StoreError::EmailTaken => AccountError::EmailTaken,
            other => AccountError::Store(other),
        }
    }
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::NicknameTaken | AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::EmailNotConfirmed => StatusCode::FORBIDDEN,
            AccountError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AccountError::Store(_) | AccountError::Mail(_) | AccountError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "An error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
