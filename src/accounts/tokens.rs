use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::TokenConfig;

/// Payload of an email confirmation token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    pub sub: String, // email
    pub iat: usize,
    pub exp: usize,
    pub aud: String, // purpose label
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid: {0}")]
    Invalid(String),
}

const CONFIRM_PURPOSE: &str = "email-confirm";

/// Signs and verifies time-limited confirmation tokens.
///
/// The HMAC key is derived from both the server secret and the purpose salt, so a token
/// minted under another salt never verifies. The salt itself never leaves the server; the
/// audience carries a fixed purpose label instead.
#[derive(Clone)]
pub struct ConfirmationTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    purpose: &'static str,
    max_age: Duration,
}

impl ConfirmationTokens {
    pub fn new(config: &TokenConfig) -> Self {
        let key = Sha256::new()
            .chain_update(config.salt.as_bytes())
            .chain_update(b"signer")
            .chain_update(config.secret.as_bytes())
            .finalize();
        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
            purpose: CONFIRM_PURPOSE,
            max_age: Duration::seconds(config.max_age_secs),
        }
    }

    pub fn issue(&self, email: &str) -> anyhow::Result<String> {
        self.issue_at(email, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, email: &str, issued_at: OffsetDateTime) -> anyhow::Result<String> {
        let exp = issued_at
            .checked_add(self.max_age)
            .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?;
        let claims = ConfirmationClaims {
            sub: email.to_string(),
            iat: issued_at.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            aud: self.purpose.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!("confirmation token signed");
        Ok(token)
    }

    /// Returns the embedded email if the token is authentic, for this purpose and young enough.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[self.purpose]);
        validation.set_required_spec_claims(&["exp", "aud", "sub"]);

        let data = decode::<ConfirmationClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        // Enforce the verifier's own max age, independent of the exp the issuer chose.
        let age = OffsetDateTime::now_utc().unix_timestamp() - data.claims.iat as i64;
        if age > self.max_age.whole_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tokens(secret: &str, salt: &str, max_age_secs: i64) -> ConfirmationTokens {
        ConfirmationTokens::new(&TokenConfig {
            secret: secret.into(),
            salt: salt.into(),
            max_age_secs,
        })
    }

    #[test]
    fn issue_and_verify_returns_email() {
        let tokens = make_tokens("dev-secret", "email-confirm", 3600);
        let token = tokens.issue("a@x.com").expect("issue");
        assert_eq!(tokens.verify(&token).expect("verify"), "a@x.com");
    }

    #[test]
    fn token_older_than_max_age_is_rejected() {
        let tokens = make_tokens("dev-secret", "email-confirm", 3600);
        let issued = OffsetDateTime::now_utc() - Duration::seconds(3601);
        let token = tokens.issue_at("a@x.com", issued).expect("issue");
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn verifier_with_shorter_max_age_rejects_older_token() {
        let issuer = make_tokens("dev-secret", "email-confirm", 3600);
        let strict = make_tokens("dev-secret", "email-confirm", 60);
        let issued = OffsetDateTime::now_utc() - Duration::seconds(120);
        let token = issuer.issue_at("a@x.com", issued).expect("issue");
        assert!(issuer.verify(&token).is_ok());
        assert_eq!(strict.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_for_other_purpose_is_rejected() {
        let confirm = make_tokens("same-secret", "email-confirm", 3600);
        let reset = make_tokens("same-secret", "password-reset", 3600);
        let token = reset.issue("a@x.com").expect("issue");
        assert!(matches!(confirm.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let ours = make_tokens("secret-a", "email-confirm", 3600);
        let theirs = make_tokens("secret-b", "email-confirm", 3600);
        let token = theirs.issue("a@x.com").expect("issue");
        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn salt_is_not_carried_in_the_token() {
        let tokens = make_tokens("dev-secret", "very-private-salt", 3600);
        let token = tokens.issue("a@x.com").expect("issue");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.set_audience(&[CONFIRM_PURPOSE]);
        let data = decode::<ConfirmationClaims>(&token, &DecodingKey::from_secret(b""), &validation)
            .expect("readable claims");

        assert_eq!(data.claims.aud, CONFIRM_PURPOSE);
        assert_eq!(data.claims.sub, "a@x.com");
        assert!(!token.contains("very-private-salt"));
    }

    #[test]
    fn out_of_range_expiry_is_an_error() {
        let tokens = make_tokens("dev-secret", "email-confirm", i64::MAX);
        assert!(tokens.issue("a@x.com").is_err());
    }

    #[test]
    fn tampered_or_garbage_tokens_are_rejected() {
        let tokens = make_tokens("dev-secret", "email-confirm", 3600);
        let mut token = tokens.issue("a@x.com").expect("issue");
        token.push('x');
        assert!(tokens.verify(&token).is_err());
        assert!(tokens.verify("not-a-token").is_err());
        assert!(tokens.verify("").is_err());
    }
}
