// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Gemini Mention CGI
//!
//! Run by a Gemini server for each request to the mention endpoint. The
//! submitted URL arrives in `QUERY_STRING`; without one the client is asked
//! for it (status 10).
//!
//! ## Configuration
//!
//! A TOML file read from `/etc/gemini-mention.toml`, or from the path in
//! `GEMINI_MENTION_CONFIG`. See [`gemini_mention::config`].
//!
//! Arguments are ignored: servers following RFC 3875 §4.4 pass the words
//! of the client's query there.

use std::io;

use tracing::{error, warn};

use gemini_mention::{
    config::{self, CapsuleConfig},
    logging,
    mailer::SmtpMailer,
    CgiResponse, GeminiClient, MentionPipeline, Report,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();

    let query = std::env::var("QUERY_STRING").unwrap_or_default();
    if query.is_empty() {
        CgiResponse::prompt().write_to(&mut stdout)?;
        return Ok(());
    }

    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let stderr = logging::stderr_dispatch();
    let config_path = config::config_path();
    let config = match CapsuleConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::dispatcher::with_default(&stderr, || {
                error!(path = %config_path.display(), error = %e, "Error loading configuration file");
            });
            CgiResponse::config_error().write_to(&mut stdout)?;
            return Ok(());
        }
    };

    let dispatch = logging::file_dispatch(&config.log_path()).unwrap_or_else(|e| {
        tracing::dispatcher::with_default(&stderr, || {
            warn!(path = %config.log_path().display(), error = %e, "Log file unavailable, continuing without log");
        });
        logging::disabled()
    });
    let _guard = tracing::dispatcher::set_default(&dispatch);

    let outcome = process(&config, &query).await;
    if let Err(e @ gemini_mention::Error::Config(_)) = &outcome {
        error!(error = %e, "Endpoint misconfigured");
    }
    CgiResponse::from_outcome(&outcome, &config).write_to(&mut stdout)?;

    Ok(())
}

async fn process(config: &CapsuleConfig, query: &str) -> gemini_mention::Result<Report> {
    let fetcher = GeminiClient::new(config.fetch_timeout(), config.max_body_bytes)
        .map_err(|e| gemini_mention::Error::Config(format!("TLS client: {e}")))?;
    let mailer = SmtpMailer::from_config(config)?;

    MentionPipeline::new(config, &fetcher, &mailer)
        .run(query)
        .await
}
