use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::accounts::{
    dto::{LoginForm, RegisterForm},
    error::{AccountError, StoreError},
    mail::confirmation_mail,
    password::{hash_password, verify_against_dummy, verify_password},
    repo_types::User,
};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn require(value: &str, field: &str) -> Result<(), AccountError> {
    if value.trim().is_empty() {
        return Err(AccountError::Validation(format!(
            "Missing required field: {}.",
            field
        )));
    }
    Ok(())
}

/// Creates an unconfirmed account and mails the confirmation link.
pub async fn register(state: &AppState, form: RegisterForm) -> Result<(), AccountError> {
    let email = normalize_email(&form.email);
    let nickname = form.nickname.trim();
    require(&email, "email")?;
    require(&form.password, "password")?;
    require(nickname, "nickname")?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AccountError::Validation("Invalid email.".into()));
    }

    let hash = hash_password(&form.password)?;
    let user = User::new_unconfirmed(&email, &hash, nickname, form.f_code.trim());
    // Signed before the write so a signing failure leaves nothing behind.
    let token = state.tokens.issue(&email)?;

    if let Err(e) = state.users.create(&user).await {
        warn!(email = %email, nickname = %nickname, error = %e, "registration rejected");
        return Err(e.into());
    }

    let confirm_url = format!("{}/confirm/{}", state.config.public_url, token);
    state
        .mailer
        .send(confirmation_mail(&email, &confirm_url))
        .await?;

    info!(email = %email, nickname = %nickname, "user registered");
    Ok(())
}

/// Marks the account embedded in `token` as confirmed and returns its email.
pub async fn confirm(state: &AppState, token: &str) -> Result<String, AccountError> {
    let email = state.tokens.verify(token).map_err(|e| {
        warn!(reason = %e, "confirmation token rejected");
        AccountError::InvalidOrExpiredToken
    })?;

    match state.users.mark_confirmed(&email).await {
        Ok(()) => {
            info!(email = %email, "email confirmed");
            Ok(email)
        }
        // The account was removed after the mail went out; treat the link as dead.
        Err(StoreError::NotFound) => {
            warn!(email = %email, "confirmation for missing account");
            Err(AccountError::InvalidOrExpiredToken)
        }
        Err(e) => Err(e.into()),
    }
}

/// Checks credentials. Unknown email and wrong password fail identically.
pub async fn login(state: &AppState, form: LoginForm) -> Result<User, AccountError> {
    let email = normalize_email(&form.email);
    require(&email, "email")?;
    require(&form.password, "password")?;

    let user = match state.users.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            verify_against_dummy(&form.password);
            warn!(email = %email, "login failed");
            return Err(AccountError::InvalidCredentials);
        }
    };

    if !verify_password(&form.password, &user.password) {
        warn!(email = %email, "login failed");
        return Err(AccountError::InvalidCredentials);
    }

    if !user.confirmed {
        warn!(email = %email, "login before confirmation");
        return Err(AccountError::EmailNotConfirmed);
    }

    info!(email = %email, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("sp ace@x.com"));
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }
}
