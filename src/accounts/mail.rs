use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Transport(String),
}

/// A rendered HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// SMTP delivery through a pooled async transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let sender = parse_mailbox(&config.default_sender)?;
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(parse_mailbox(&mail.to)?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        info!(to = %mail.to, "mail sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Builds the account activation mail pointing at `confirm_url`.
pub fn confirmation_mail(to: &str, confirm_url: &str) -> OutgoingMail {
    debug!(to = %to, "rendering confirmation mail");
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body>
    <p>Welcome! Thanks for signing up. Please follow this link to activate your account:</p>
    <p><a href="{url}">{url}</a></p>
    <br>
    <p>Cheers!</p>
</body>
</html>"#,
        url = html_escape(confirm_url),
    );
    OutgoingMail {
        to: to.to_string(),
        subject: "Please confirm your email".to_string(),
        html,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every mail instead of delivering it.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingMail>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn last(&self) -> Option<OutgoingMail> {
            self.sent.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_mail_embeds_link() {
        let mail = confirmation_mail("a@x.com", "http://localhost:4000/confirm/abc.def.ghi");
        assert_eq!(mail.to, "a@x.com");
        assert_eq!(mail.subject, "Please confirm your email");
        assert!(mail
            .html
            .contains(r#"href="http://localhost:4000/confirm/abc.def.ghi""#));
    }

    #[test]
    fn confirmation_mail_escapes_markup() {
        let mail = confirmation_mail("a@x.com", r#"http://x/"><script>"#);
        assert!(!mail.html.contains("<script>"));
        assert!(mail.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_sender() {
        let config = MailConfig {
            server: "localhost".into(),
            port: 2525,
            use_tls: false,
            username: "u".into(),
            password: "p".into(),
            default_sender: "not an address".into(),
        };
        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailError::Address { .. })
        ));
    }
}
