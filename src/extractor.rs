// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mention link extraction from gemtext.
//!
//! A mention is a link line pointing back at the capsule and labelled as a
//! reply:
//!
//! ```text
//! => gemini://example.org/log/post.gmi RE: Nice post!
//! ```

use regex::Regex;

use crate::error::{Error, Result};
use crate::fetcher::FetchedDocument;

/// One matched link line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCandidate {
    /// The full matched line.
    pub line: String,
    /// Target reference, `gemini://<capsule root>...`.
    pub target: String,
    /// Free text after `RE:`.
    pub label: String,
}

/// Link-line grammar compiled for one capsule root.
#[derive(Debug, Clone)]
pub struct MentionPattern {
    regex: Regex,
}

impl MentionPattern {
    pub fn new(capsule_root: &str) -> Result<Self> {
        let pattern = format!(
            r"(?i)^=>\s*(?P<target>gemini://{}\S+)\s+RE:\s*(?P<label>.*)$",
            regex::escape(capsule_root)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("capsule root {capsule_root:?}: {e}")))?;
        Ok(Self { regex })
    }

    /// Match a single line.
    pub fn candidate(&self, line: &str) -> Option<MentionCandidate> {
        let caps = self.regex.captures(line)?;
        Some(MentionCandidate {
            line: line.to_string(),
            target: caps["target"].to_string(),
            label: caps["label"].trim_end().to_string(),
        })
    }

    /// All matching lines of `text`, in document order.
    pub fn extract(&self, text: &str) -> Vec<MentionCandidate> {
        text.lines().filter_map(|line| self.candidate(line)).collect()
    }
}

/// Extract mention candidates from a fetched document.
pub fn extract(doc: &FetchedDocument, pattern: &MentionPattern) -> Vec<MentionCandidate> {
    pattern.extract(&doc.text())
}
