// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the mention pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::fetcher::FetchFailure;

/// Every way a single mention submission can end without a notification.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Unsupported scheme {scheme:?}: only gemini URLs are accepted")]
    UnsupportedScheme { scheme: String },

    #[error("Fetching {url} failed: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchFailure,
    },

    #[error("Certificate for {url} expired at {not_after}")]
    ExpiredCertificate {
        url: String,
        not_after: DateTime<Utc>,
    },

    #[error("{url} answered with status {status} {meta}")]
    NonSuccessStatus { url: String, status: u8, meta: String },

    #[error("No mention found in the submitted document")]
    NoMentionFound,

    #[error("No mentioned link resolves on this capsule")]
    NoVerifiedMention,

    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the two outcomes where the pipeline reached a legitimate
    /// "nothing to notify" conclusion rather than hitting a fault.
    pub fn is_negative_outcome(&self) -> bool {
        matches!(self, Error::NoMentionFound | Error::NoVerifiedMention)
    }

    /// True for errors raised by the input validator, before any network access.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedReference(_) | Error::UnsupportedScheme { .. }
        )
    }

    /// Short machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedReference(_) => "MALFORMED_REFERENCE",
            Error::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
            Error::FetchFailed { .. } => "FETCH_FAILED",
            Error::ExpiredCertificate { .. } => "EXPIRED_CERTIFICATE",
            Error::NonSuccessStatus { .. } => "NON_SUCCESS_STATUS",
            Error::NoMentionFound => "NO_MENTION_FOUND",
            Error::NoVerifiedMention => "NO_VERIFIED_MENTION",
            Error::DeliveryFailed(_) => "DELIVERY_FAILED",
            Error::Config(_) => "CONFIG",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
