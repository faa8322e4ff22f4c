// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Gemini Mention
//!
//! Verifies Gemini "mentions" (reply backlinks) submitted to a capsule and
//! notifies the capsule owner by email:
//!
//! - Submitted reference validation (gemini scheme only, no `..`)
//! - Gemini fetch with deadline and certificate-expiry check
//! - Mention link extraction (`=> gemini://<root>/... RE: ...`)
//! - Re-verification of each mentioned page, capped per submission
//! - Owner notification over SMTP

pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logging;
pub mod mailer;
pub mod notifier;
pub mod pipeline;
pub mod response;
pub mod validator;
pub mod verifier;

pub use config::CapsuleConfig;
pub use error::{Error, Result};
pub use fetcher::{Fetch, GeminiClient};
pub use notifier::MailTransport;
pub use pipeline::{MentionPipeline, Report};
pub use response::CgiResponse;
