// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mention verification.
//!
//! Each candidate's target is fetched from the live capsule; only targets
//! that answer with a success status count. The number of fetches one
//! submission can cause is capped by `max_count`.

use tracing::{debug, info};
use url::Url;

use crate::config::root_host;
use crate::extractor::MentionCandidate;
use crate::fetcher::Fetch;

/// A mention whose target resolved on the capsule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMention {
    pub target: Url,
    pub label: String,
}

/// Verify at most `max_count` candidates, sequentially and in order.
///
/// Failed candidates are dropped; an empty result means nothing verified.
pub async fn verify<F: Fetch + ?Sized>(
    candidates: &[MentionCandidate],
    capsule_root: &str,
    max_count: usize,
    fetcher: &F,
) -> Vec<VerifiedMention> {
    let considered = max_count.min(candidates.len());
    if considered < candidates.len() {
        info!(
            found = candidates.len(),
            considered, "Mention count above limit, ignoring the rest"
        );
    }

    let capsule_host = root_host(capsule_root);
    let mut verified = Vec::with_capacity(considered);

    for candidate in &candidates[..considered] {
        let target = match Url::parse(&candidate.target) {
            Ok(url) => url,
            Err(e) => {
                debug!(target = %candidate.target, error = %e, "Mention target does not parse");
                continue;
            }
        };

        let host_matches = target
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(capsule_host));
        if !host_matches {
            info!(target = %target, capsule = %capsule_host, "Mention target is not on this capsule");
            continue;
        }

        match fetcher.fetch(&target).await {
            Ok(_) => {
                debug!(target = %target, "Mention verified");
                verified.push(VerifiedMention {
                    target,
                    label: candidate.label.clone(),
                });
            }
            Err(e) => {
                info!(target = %target, error = %e, "Mention target does not resolve, dropped");
            }
        }
    }

    verified
}
