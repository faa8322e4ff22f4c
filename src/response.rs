// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CGI response rendering.
//!
//! A response is a Gemini status line followed, for status 20, by a blank
//! line and a gemtext body that always ends with the navigation footer.

use std::fmt;
use std::io::{self, Write};

use crate::config::CapsuleConfig;
use crate::error::Error;
use crate::pipeline::Report;

pub const STATUS_INPUT: u8 = 10;
pub const STATUS_SUCCESS: u8 = 20;
pub const STATUS_CGI_ERROR: u8 = 42;

pub const PROMPT: &str = "Enter the URL containing mentions:";
const GEMTEXT: &str = "text/gemini; charset=utf-8";

/// A complete response, written once to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiResponse {
    pub status: u8,
    pub meta: String,
    pub body: Option<String>,
}

impl CgiResponse {
    /// Ask the client for the URL to submit.
    pub fn prompt() -> Self {
        Self {
            status: STATUS_INPUT,
            meta: PROMPT.to_string(),
            body: None,
        }
    }

    /// The endpoint itself is misconfigured.
    pub fn config_error() -> Self {
        Self {
            status: STATUS_CGI_ERROR,
            meta: "An error occurred, please retry later".to_string(),
            body: None,
        }
    }

    /// Render the outcome of a pipeline run.
    pub fn from_outcome(outcome: &Result<Report, Error>, config: &CapsuleConfig) -> Self {
        let mut body = match outcome {
            Ok(report) => success_text(report),
            Err(e) => error_text(e),
        };
        body.push('\n');
        body.push_str(&format!("=> {} Return to homepage\n", config.home_link));
        body.push_str(&format!("=> {} Send another mention\n", config.submit_link));

        Self {
            status: STATUS_SUCCESS,
            meta: GEMTEXT.to_string(),
            body: Some(body),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{self}")?;
        out.flush()
    }
}

impl fmt::Display for CgiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\r\n", self.status, self.meta)?;
        if let Some(body) = &self.body {
            write!(f, "\n{body}")?;
        }
        Ok(())
    }
}

fn success_text(report: &Report) -> String {
    let mut text = String::from(
        "The notification has successfully been sent, thank you for sharing!\n\n",
    );
    text.push_str(&format!("Your URL:\n=> {}\n", report.origin));
    text.push_str("You mentioned:\n");
    for mention in &report.mentions {
        text.push_str(&format!("=> {}\n", mention.target));
    }
    text
}

fn error_text(error: &Error) -> String {
    match error {
        Error::MalformedReference(_) => "Url is not valid.\n".to_string(),
        Error::UnsupportedScheme { scheme } => {
            format!("Url is not valid: scheme {scheme:?} is not supported, only gemini URLs are.\n")
        }
        Error::FetchFailed { url, source } => {
            format!("Error retrieving content from {url}\n{source}\n")
        }
        Error::NonSuccessStatus { url, status, meta } => {
            format!("Error retrieving content from {url}\nThe capsule answered {status} {meta}\n")
        }
        Error::ExpiredCertificate { url, .. } => {
            format!("Invalid certificate for capsule: {url}\nLink is ignored.\n")
        }
        Error::NoMentionFound => "No mention found in submitted link, ignoring.\n".to_string(),
        Error::NoVerifiedMention => "The mention link found in the remote url doesn't match any valid page of this capsule, no notification will be sent.\n".to_string(),
        Error::DeliveryFailed(_) => {
            "An error occurred when sending the notification, sorry.\n".to_string()
        }
        Error::Config(_) => "An error occurred, please retry later.\n".to_string(),
    }
}
