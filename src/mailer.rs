// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMTP delivery of notifications through the configured relay.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::{CapsuleConfig, SmtpSecurity};
use crate::error::{Error, Result};
use crate::notifier::{MailTransport, NotificationMessage};

/// Authenticated SMTP relay transport.
///
/// A whole delivery shares the fetch deadline, which is kept below the
/// server's CGI kill timer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn from_config(config: &CapsuleConfig) -> Result<Self> {
        let relay = config.smtp_server.as_str();
        let builder = match config.smtp_security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay),
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(relay),
            SmtpSecurity::Plain => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(relay)),
        }
        .map_err(|e| Error::Config(format!("SMTP relay {relay}: {e}")))?;

        let timeout = config.fetch_timeout();
        let mut builder = builder.port(config.port).timeout(Some(timeout));
        if !config.login.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.login.clone(),
                config.password.clone(),
            ));
        }

        debug!(relay = %relay, port = config.port, security = ?config.smtp_security, "SMTP transport ready");
        Ok(Self {
            transport: builder.build(),
            timeout,
        })
    }
}

/// Convert a composed notification into a lettre message.
pub fn build_email(message: &NotificationMessage) -> Result<Message> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| Error::DeliveryFailed(format!("sender {:?}: {e}", message.from)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| Error::DeliveryFailed(format!("recipient {:?}: {e}", message.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| Error::DeliveryFailed(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        let email = build_email(message)?;
        let response = tokio::time::timeout(self.timeout, self.transport.send(email))
            .await
            .map_err(|_| {
                Error::DeliveryFailed(format!("relay did not answer within {:?}", self.timeout))
            })?
            .map_err(|e| Error::DeliveryFailed(e.to_string()))?;
        debug!(code = %response.code(), "Relay accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> NotificationMessage {
        NotificationMessage {
            from: "mentions@example.org".into(),
            to: to.into(),
            subject: "New Gemini Mention!".into(),
            body: "A fellow geminaut responded to 1 of your post(s).\n".into(),
        }
    }

    #[test]
    fn test_build_email_headers() {
        let email = build_email(&message("owner@example.org")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("From: mentions@example.org"));
        assert!(raw.contains("To: owner@example.org"));
        assert!(raw.contains("Subject: New Gemini Mention!"));
        assert!(raw.contains("A fellow geminaut responded"));
    }

    #[test]
    fn test_bad_recipient_is_delivery_failure() {
        assert!(matches!(
            build_email(&message("not an address")),
            Err(Error::DeliveryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_relay_gives_up_within_fetch_deadline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _relay = tokio::spawn(async move {
            // Accept but never send the SMTP greeting.
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = CapsuleConfig::from_toml_str(&format!(
            r#"
CapsuleRootAddress = "example.org"
Contact = "owner@example.org"
From = "mentions@example.org"
SmtpServer = "127.0.0.1"
Port = {port}
SmtpSecurity = "none"
FetchTimeoutSecs = 1
"#
        ))
        .unwrap();
        let mailer = SmtpMailer::from_config(&config).unwrap();

        let started = std::time::Instant::now();
        let result = mailer.deliver(&message("owner@example.org")).await;

        assert!(matches!(result, Err(Error::DeliveryFailed(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_transport_builds_for_every_security_mode() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut config = CapsuleConfig::from_toml_str(
            r#"
CapsuleRootAddress = "example.org"
Contact = "owner@example.org"
From = "mentions@example.org"
SmtpServer = "localhost"
Login = "bot"
Password = "secret"
"#,
        )
        .unwrap();
        for security in [SmtpSecurity::StartTls, SmtpSecurity::Tls, SmtpSecurity::Plain] {
            config.smtp_security = security;
            assert!(SmtpMailer::from_config(&config).is_ok());
        }
    }
}
