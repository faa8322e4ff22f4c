// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory collaborators.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gemini_mention::{
    error::{Error, Result},
    fetcher::{accept_response, Fetch, FetchFailure, FetchedDocument, ResponseHeader},
    notifier::{MailTransport, NotificationMessage},
};
use rustls::pki_types::CertificateDer;
use url::Url;

/// Valid from 2020-01-01 to 2021-01-01.
pub const CERT_2020: &[u8] = include_bytes!("../fixtures/capsule-2020.der");

/// Valid from 2020-01-01 to 2099-12-31.
pub const CERT_2099: &[u8] = include_bytes!("../fixtures/capsule-2099.der");

pub fn certificate(der: &[u8]) -> CertificateDer<'static> {
    CertificateDer::from(der.to_vec())
}

#[derive(Debug, Clone)]
struct Page {
    status: u8,
    meta: String,
    body: String,
    certificates: Vec<CertificateDer<'static>>,
}

/// Serves scripted pages by exact URL; anything else is unreachable.
///
/// Responses go through the same [`accept_response`] policy as the real
/// client, evaluated at a configurable "now".
pub struct ScriptedFetcher {
    pages: HashMap<String, Page>,
    now: DateTime<Utc>,
    calls: Mutex<Vec<String>>,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            now: Utc::now(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// `20 text/gemini` page without certificates.
    pub fn page(self, url: &str, body: &str) -> Self {
        self.status(url, 20, "text/gemini", body)
    }

    pub fn status(mut self, url: &str, status: u8, meta: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                status,
                meta: meta.to_string(),
                body: body.to_string(),
                certificates: Vec::new(),
            },
        );
        self
    }

    /// `20 text/gemini` page served with the given leaf certificate.
    pub fn page_with_certificate(mut self, url: &str, body: &str, der: &[u8]) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                status: 20,
                meta: "text/gemini".to_string(),
                body: body.to_string(),
                certificates: vec![certificate(der)],
            },
        );
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        self.calls.lock().unwrap().push(url.to_string());

        let page = self.pages.get(url.as_str()).ok_or_else(|| Error::FetchFailed {
            url: url.to_string(),
            source: FetchFailure::Connect(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no scripted page",
            )),
        })?;

        let doc = FetchedDocument {
            url: url.clone(),
            header: ResponseHeader {
                status: page.status,
                meta: page.meta.clone(),
            },
            body: page.body.clone().into_bytes(),
            peer_certificates: page.certificates.clone(),
        };
        accept_response(doc, self.now)
    }
}

/// Records delivered messages; optionally refuses every delivery.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<NotificationMessage>>,
    refuse: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        if self.refuse {
            return Err(Error::DeliveryFailed("535 authentication failed".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
