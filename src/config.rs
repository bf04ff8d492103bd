use std::fmt;

use anyhow::Context;

use crate::dynamo::AwsConfig;

/// Secret and purpose salt for confirmation tokens.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub salt: String,
    pub max_age_secs: i64,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    pub default_sender: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("default_sender", &self.default_sender)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TableNames {
    pub users: String,
    pub nicknames: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            users: "users".into(),
            nicknames: "user_nicknames".into(),
        }
    }
}

impl TableNames {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            users: std::env::var("USERS_TABLE").unwrap_or(defaults.users),
            nicknames: std::env::var("NICKNAMES_TABLE").unwrap_or(defaults.nicknames),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base used to build links in outgoing mail, without a trailing slash.
    pub public_url: String,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
    pub tables: TableNames,
    pub aws: AwsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(4000);
        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let tokens = TokenConfig {
            secret: required("SECRET_KEY")?,
            salt: required("SECURITY_PASSWORD_SALT")?,
            max_age_secs: parse_max_age(std::env::var("CONFIRM_MAX_AGE_SECS").ok().as_deref())?,
        };

        let mail = MailConfig {
            server: required("MAIL_SERVER")?,
            port: required("MAIL_PORT")?
                .parse()
                .context("MAIL_PORT must be a port number")?,
            use_tls: parse_flag(&required("MAIL_USE_TLS")?),
            username: required("MAIL_USERNAME")?,
            password: required("MAIL_PASSWORD")?,
            default_sender: required("MAIL_DEFAULT_SENDER")?,
        };

        Ok(Self {
            host,
            port,
            public_url,
            tokens,
            mail,
            tables: TableNames::from_env(),
            aws: AwsConfig::default(),
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {}", name))
}

const DEFAULT_CONFIRM_MAX_AGE_SECS: i64 = 3600;
const MAX_CONFIRM_MAX_AGE_SECS: i64 = 30 * 24 * 3600;

fn parse_max_age(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_CONFIRM_MAX_AGE_SECS);
    };
    let secs: i64 = raw
        .trim()
        .parse()
        .context("CONFIRM_MAX_AGE_SECS must be a whole number of seconds")?;
    anyhow::ensure!(
        (1..=MAX_CONFIRM_MAX_AGE_SECS).contains(&secs),
        "CONFIRM_MAX_AGE_SECS must be between 1 and {} seconds, got {}",
        MAX_CONFIRM_MAX_AGE_SECS,
        secs
    );
    Ok(secs)
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
