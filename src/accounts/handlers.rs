use axum::{
    extract::{rejection::FormRejection, Path, State},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    accounts::{
        dto::{LoginForm, MessageResponse, RegisterForm},
        error::AccountError,
        services,
    },
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/confirm/:token", get(confirm))
        .route("/login", post(login))
}

fn bad_form(e: FormRejection) -> AccountError {
    AccountError::Validation(format!("Invalid form body: {}", e.body_text()))
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<Json<MessageResponse>, AccountError> {
    let Form(form) = form.map_err(bad_form)?;
    services::register(&state, form).await?;
    Ok(Json(MessageResponse::new(
        "User registered successfully. Please confirm your email.",
    )))
}

#[instrument(skip(state, token))]
pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AccountError> {
    services::confirm(&state, &token).await?;
    Ok(Json(MessageResponse::new("Email confirmed successfully.")))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<MessageResponse>, AccountError> {
    let Form(form) = form.map_err(bad_form)?;
    services::login(&state, form).await?;
    Ok(Json(MessageResponse::new("Login successful.")))
}
