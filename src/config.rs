// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the Gemini mention endpoint.
//!
//! Read once per invocation from a TOML file with PascalCase keys:
//!
//! ```toml
//! CapsuleRootAddress = "example.org"
//! MaxMentions = 5
//! Contact = "owner@example.org"
//! Log = "/var/log/gemini-mention.log"
//! From = "mentions@example.org"
//! SmtpServer = "smtp.example.org"
//! Port = 587
//! Login = "mentions@example.org"
//! Password = "secret"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gemini-mention.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "GEMINI_MENTION_CONFIG";

/// Location of the configuration file: [`CONFIG_PATH_ENV`] when set,
/// otherwise [`DEFAULT_CONFIG_PATH`].
///
/// Command-line arguments are never consulted; CGI servers fill them with
/// words of the client's query.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// How the SMTP relay connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (default)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
    /// No encryption, for a relay on localhost
    #[serde(rename = "none")]
    Plain,
}

/// Configuration for one capsule's mention endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapsuleConfig {
    /// Host, with optional path prefix, of the local capsule. No scheme.
    pub capsule_root_address: String,

    /// Maximum number of mention links verified per submission (default: 5)
    #[serde(default = "default_max_mentions")]
    pub max_mentions: usize,

    /// Owner address notifications are sent to
    pub contact: String,

    /// Log file path (default: ./gemini-mention.log)
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Sender address of notifications
    pub from: String,

    /// SMTP relay host
    pub smtp_server: String,

    /// SMTP relay port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub smtp_security: SmtpSecurity,

    /// Footer link back to the capsule home page
    #[serde(default = "default_home_link")]
    pub home_link: String,

    /// Footer link to the mention submission endpoint
    #[serde(default = "default_submit_link")]
    pub submit_link: String,

    /// Deadline for each Gemini fetch in seconds (default: 4). Keep it below
    /// the server's CGI kill timer.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Largest accepted response body (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

// Default value functions
fn default_max_mentions() -> usize {
    5
}

fn default_smtp_port() -> u16 {
    587
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./gemini-mention.log")
}

fn default_home_link() -> String {
    "/index.gmi".to_string()
}

fn default_submit_link() -> String {
    "/.well-known/mentions".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    4 // Gemserv kills CGI scripts after 5s
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl CapsuleConfig {
    /// Read and check the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let root = self.capsule_root_address.as_str();
        if root.is_empty() {
            return Err(Error::Config("CapsuleRootAddress is empty".into()));
        }
        if root.contains("://") {
            return Err(Error::Config(format!(
                "CapsuleRootAddress must not carry a scheme: {root}"
            )));
        }
        if root.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "CapsuleRootAddress contains whitespace: {root:?}"
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("FetchTimeoutSecs must be positive".into()));
        }
        Ok(())
    }

    /// Host part of the capsule root, without path prefix or port.
    pub fn capsule_host(&self) -> &str {
        root_host(&self.capsule_root_address)
    }

    /// Log file path, falling back to the default when unset or empty.
    pub fn log_path(&self) -> PathBuf {
        match &self.log {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => default_log_path(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Host part of a capsule root address such as `example.org:1965/~user`.
pub fn root_host(capsule_root: &str) -> &str {
    let authority = capsule_root.split('/').next().unwrap_or(capsule_root);
    match authority.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}
