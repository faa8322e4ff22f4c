// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submitted reference validation.
//!
//! Turns the raw, attacker-controlled query string into a [`NormalizedUrl`]:
//! - Percent-decoding (query-string rules, exactly once)
//! - Textual removal of `..` sequences
//! - Scheme restriction (`gemini`, or none at all)
//! - Reconstruction as `gemini://<host>[:port]<path>`, dropping userinfo,
//!   query and fragment
//!
//! After the single decode every `%` is literal, so the rebuilt path is
//! re-encoded and validating a [`NormalizedUrl`] again yields itself.
//!
//! No network access happens here.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// The only scheme the pipeline speaks.
pub const GEMINI_SCHEME: &str = "gemini";

/// Default Gemini port.
pub const DEFAULT_PORT: u16 = 1965;

const TRAVERSAL: &str = "..";

/// A submitted reference that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    url: Url,
}

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Validate and normalize a raw submitted reference.
pub fn validate(raw: &str) -> Result<NormalizedUrl> {
    let decoded = query_unescape(raw)?;
    let stripped = strip_traversal(&decoded);
    let parsed = parse_reference(&stripped.replace('%', "%25"))?;

    if parsed.scheme() != GEMINI_SCHEME {
        debug!(scheme = %parsed.scheme(), "Rejected non-gemini scheme");
        return Err(Error::UnsupportedScheme {
            scheme: parsed.scheme().to_string(),
        });
    }

    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => {
            return Err(Error::MalformedReference(format!(
                "{stripped}: missing host"
            )))
        }
    };

    let mut rebuilt = format!("{GEMINI_SCHEME}://{host}");
    if let Some(port) = parsed.port() {
        rebuilt.push_str(&format!(":{port}"));
    }
    // `+` decodes to a space in a query string, so it stays escaped.
    rebuilt.push_str(&parsed.path().replace('+', "%2B"));

    let url = Url::parse(&rebuilt)
        .map_err(|e| Error::MalformedReference(format!("{rebuilt}: {e}")))?;

    debug!(normalized = %url, "Reference validated");
    Ok(NormalizedUrl { url })
}

/// Remove every `..` from `text`, scanning left to right.
///
/// A maximal run of `n` dots collapses to `n % 2` dots, so the output never
/// contains `..` and a second pass is a no-op.
pub fn strip_traversal(text: &str) -> String {
    text.replace(TRAVERSAL, "")
}

/// Decode `%XX` escapes and `+` the way a CGI query string is decoded.
fn query_unescape(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(Error::MalformedReference(format!(
                    "invalid percent escape at byte {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|s| s.into_owned())
        .map_err(|e| Error::MalformedReference(format!("not valid UTF-8: {e}")))
}

/// Parse `text` as a URL, inserting the gemini scheme when none is present.
fn parse_reference(text: &str) -> Result<Url> {
    let text = text.trim();
    match Url::parse(text) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let with_scheme = if text.starts_with("//") {
                format!("{GEMINI_SCHEME}:{text}")
            } else {
                format!("{GEMINI_SCHEME}://{text}")
            };
            Url::parse(&with_scheme)
                .map_err(|e| Error::MalformedReference(format!("{text}: {e}")))
        }
        Err(e) => Err(Error::MalformedReference(format!("{text}: {e}"))),
    }
}
