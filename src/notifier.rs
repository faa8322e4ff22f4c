// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Owner notification.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::CapsuleConfig;
use crate::error::{Error, Result};
use crate::validator::NormalizedUrl;
use crate::verifier::VerifiedMention;

pub const SUBJECT: &str = "New Gemini Mention!";

/// A composed notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers a message to its recipient. Called once; no retries.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()>;
}

/// Build the owner notification for `verified` mentions found in `origin`.
pub fn compose(
    config: &CapsuleConfig,
    origin: &NormalizedUrl,
    verified: &[VerifiedMention],
) -> NotificationMessage {
    let mut body = format!(
        "A fellow geminaut responded to {} of your post(s).\n\
         The following link(s) are mentioned within the response:\n",
        verified.len()
    );
    for mention in verified {
        body.push_str(mention.target.as_str());
        body.push('\n');
    }
    body.push_str("\nThe response link is:\n");
    body.push_str(origin.as_str());
    body.push('\n');

    NotificationMessage {
        from: config.from.clone(),
        to: config.contact.clone(),
        subject: SUBJECT.to_string(),
        body,
    }
}

/// Compose and deliver the notification in a single attempt.
pub async fn notify<T: MailTransport + ?Sized>(
    config: &CapsuleConfig,
    origin: &NormalizedUrl,
    verified: &[VerifiedMention],
    transport: &T,
) -> Result<()> {
    let message = compose(config, origin, verified);
    match transport.deliver(&message).await {
        Ok(()) => {
            info!(to = %message.to, mentions = verified.len(), "Notification sent");
            Ok(())
        }
        Err(e) => {
            warn!(to = %message.to, error = %e, "Notification delivery failed");
            Err(match e {
                Error::DeliveryFailed(_) => e,
                other => Error::DeliveryFailed(other.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate;
    use url::Url;

    fn config() -> CapsuleConfig {
        CapsuleConfig::from_toml_str(
            r#"
CapsuleRootAddress = "example.org"
Contact = "owner@example.org"
From = "mentions@example.org"
SmtpServer = "smtp.example.org"
"#,
        )
        .unwrap()
    }

    fn mention(target: &str) -> VerifiedMention {
        VerifiedMention {
            target: Url::parse(target).unwrap(),
            label: String::new(),
        }
    }

    #[test]
    fn test_compose_lists_mentions_and_origin() {
        let origin = validate("gemini://remote.net/replies/1.gmi").unwrap();
        let message = compose(
            &config(),
            &origin,
            &[
                mention("gemini://example.org/a.gmi"),
                mention("gemini://example.org/b.gmi"),
            ],
        );

        assert_eq!(message.to, "owner@example.org");
        assert_eq!(message.from, "mentions@example.org");
        assert_eq!(message.subject, SUBJECT);
        assert_eq!(
            message.body,
            "A fellow geminaut responded to 2 of your post(s).\n\
             The following link(s) are mentioned within the response:\n\
             gemini://example.org/a.gmi\n\
             gemini://example.org/b.gmi\n\
             \n\
             The response link is:\n\
             gemini://remote.net/replies/1.gmi\n"
        );
    }

    struct Refusing;

    #[async_trait]
    impl MailTransport for Refusing {
        async fn deliver(&self, _message: &NotificationMessage) -> Result<()> {
            Err(Error::Config("relay unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_delivery_failed() {
        let origin = validate("gemini://remote.net/").unwrap();
        let result = notify(
            &config(),
            &origin,
            &[mention("gemini://example.org/a")],
            &Refusing,
        )
        .await;
        assert!(matches!(result, Err(Error::DeliveryFailed(msg)) if msg.contains("relay unreachable")));
    }
}
