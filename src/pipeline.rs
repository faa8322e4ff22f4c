// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! One mention submission, from raw reference to notification.

use tracing::{info, warn};

use crate::config::CapsuleConfig;
use crate::error::{Error, Result};
use crate::extractor::{self, MentionPattern};
use crate::fetcher::Fetch;
use crate::notifier::{self, MailTransport};
use crate::validator::{self, NormalizedUrl};
use crate::verifier::{self, VerifiedMention};

/// Successful outcome: the owner was notified about `mentions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub origin: NormalizedUrl,
    pub mentions: Vec<VerifiedMention>,
}

/// Runs the validate → fetch → extract → verify → notify stages.
pub struct MentionPipeline<'a, F: ?Sized, M: ?Sized> {
    config: &'a CapsuleConfig,
    fetcher: &'a F,
    mailer: &'a M,
}

impl<'a, F, M> MentionPipeline<'a, F, M>
where
    F: Fetch + ?Sized,
    M: MailTransport + ?Sized,
{
    pub fn new(config: &'a CapsuleConfig, fetcher: &'a F, mailer: &'a M) -> Self {
        Self {
            config,
            fetcher,
            mailer,
        }
    }

    /// Process one submitted reference. Every stage failure ends the run.
    pub async fn run(&self, raw: &str) -> Result<Report> {
        info!(reference = %raw, "Received Gemini mention");
        let outcome = self.run_stages(raw).await;
        match &outcome {
            Ok(report) => info!(
                origin = %report.origin,
                mentions = report.mentions.len(),
                "Mention processed"
            ),
            Err(e) if e.is_negative_outcome() => {
                info!(reference = %raw, code = e.code(), "{e}")
            }
            Err(e) => warn!(reference = %raw, code = e.code(), error = %e, "Mention rejected"),
        }
        outcome
    }

    async fn run_stages(&self, raw: &str) -> Result<Report> {
        let origin = validator::validate(raw)?;
        let pattern = MentionPattern::new(&self.config.capsule_root_address)?;

        let candidates = {
            let document = self.fetcher.fetch(origin.as_url()).await?;
            extractor::extract(&document, &pattern)
        };
        if candidates.is_empty() {
            return Err(Error::NoMentionFound);
        }
        info!(origin = %origin, candidates = candidates.len(), "Mention candidates found");

        let mentions = verifier::verify(
            &candidates,
            &self.config.capsule_root_address,
            self.config.max_mentions,
            self.fetcher,
        )
        .await;
        if mentions.is_empty() {
            return Err(Error::NoVerifiedMention);
        }

        notifier::notify(self.config, &origin, &mentions, self.mailer).await?;

        Ok(Report { origin, mentions })
    }
}
