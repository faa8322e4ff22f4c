// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Gemini protocol fetcher.
//!
//! One request per connection: TLS handshake, `<url>\r\n`, then a
//! `<status> <meta>\r\n` header followed by the body until EOF. The whole
//! exchange is bounded by a single deadline.
//!
//! Capsules usually present self-signed certificates, so identity is not
//! checked. Freshness is: [`accept_response`] rejects an expired leaf
//! certificate before looking at the status, and every [`Fetch`]
//! implementation goes through it.

use std::borrow::Cow;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::error::{Error, Result};
use crate::validator::DEFAULT_PORT;

/// Maximum length of the meta field in a response header.
pub const MAX_META_LEN: usize = 1024;

/// Status (2) + space (1) + meta + CRLF (2).
const MAX_HEADER_LINE: usize = 2 + 1 + MAX_META_LEN + 2;

const READ_CHUNK: usize = 8192;

/// Why a fetch could not complete at the transport level.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("URL has no host")]
    MissingHost,

    #[error("invalid TLS server name: {0}")]
    ServerName(String),

    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("TLS configuration failed: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed response header: {0}")]
    MalformedHeader(String),

    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("unreadable peer certificate: {0}")]
    Certificate(String),
}

/// Response status classes, keyed by the first status digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificateRequired,
}

impl StatusClass {
    pub fn from_status(status: u8) -> Option<Self> {
        match status / 10 {
            1 => Some(Self::Input),
            2 => Some(Self::Success),
            3 => Some(Self::Redirect),
            4 => Some(Self::TemporaryFailure),
            5 => Some(Self::PermanentFailure),
            6 => Some(Self::ClientCertificateRequired),
            _ => None,
        }
    }
}

/// Parsed `<status> <meta>` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: u8,
    pub meta: String,
}

impl ResponseHeader {
    /// Parse a header line, with or without its trailing line break.
    pub fn parse(line: &[u8]) -> std::result::Result<Self, FetchFailure> {
        let line = line
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(line);

        let text = std::str::from_utf8(line)
            .map_err(|_| FetchFailure::MalformedHeader("header is not UTF-8".into()))?;

        let (code, meta) = match text.get(..2) {
            Some(code) if code.bytes().all(|b| b.is_ascii_digit()) => (code, &text[2..]),
            _ => {
                return Err(FetchFailure::MalformedHeader(format!(
                    "no status code in {text:?}"
                )))
            }
        };

        let meta = match meta.strip_prefix(' ') {
            Some(rest) => rest,
            None if meta.is_empty() => meta,
            None => {
                return Err(FetchFailure::MalformedHeader(format!(
                    "expected space after status in {text:?}"
                )))
            }
        };

        if meta.len() > MAX_META_LEN {
            return Err(FetchFailure::MalformedHeader("meta too long".into()));
        }

        let status: u8 = code
            .parse()
            .map_err(|_| FetchFailure::MalformedHeader(format!("bad status {code:?}")))?;
        if StatusClass::from_status(status).is_none() {
            return Err(FetchFailure::MalformedHeader(format!(
                "unknown status {status}"
            )));
        }

        Ok(Self {
            status,
            meta: meta.to_string(),
        })
    }

    pub fn class(&self) -> Option<StatusClass> {
        StatusClass::from_status(self.status)
    }
}

/// A response as it came off the wire, together with the peer's certificates.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: Url,
    pub header: ResponseHeader,
    pub body: Vec<u8>,
    /// Leaf first, as presented during the handshake. Empty when the
    /// transport carried no certificates.
    pub peer_certificates: Vec<CertificateDer<'static>>,
}

impl FetchedDocument {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Something that can retrieve a Gemini resource.
///
/// Implementations return `Ok` only for documents that passed
/// [`accept_response`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument>;
}

/// Certificate-freshness and status policy shared by every fetch.
///
/// An expired leaf certificate fails the fetch even when the status is a
/// success; only then is a non-success status reported.
pub fn accept_response(doc: FetchedDocument, now: DateTime<Utc>) -> Result<FetchedDocument> {
    if let Some(leaf) = doc.peer_certificates.first() {
        let not_after = leaf_not_after(leaf).map_err(|source| Error::FetchFailed {
            url: doc.url.to_string(),
            source,
        })?;
        if now > not_after {
            warn!(url = %doc.url, %not_after, "Peer certificate expired");
            return Err(Error::ExpiredCertificate {
                url: doc.url.to_string(),
                not_after,
            });
        }
    }

    if doc.header.class() != Some(StatusClass::Success) {
        debug!(url = %doc.url, status = doc.header.status, meta = %doc.header.meta, "Non-success status");
        return Err(Error::NonSuccessStatus {
            url: doc.url.to_string(),
            status: doc.header.status,
            meta: doc.header.meta.clone(),
        });
    }

    Ok(doc)
}

/// The "not valid after" instant of a DER certificate.
pub fn leaf_not_after(cert: &CertificateDer<'_>) -> std::result::Result<DateTime<Utc>, FetchFailure> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|e| FetchFailure::Certificate(e.to_string()))?;
    let timestamp = parsed.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| FetchFailure::Certificate(format!("notAfter out of range: {timestamp}")))
}

/// Read a response header and body from an open stream.
pub async fn read_response<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_body_bytes: usize,
) -> std::result::Result<(ResponseHeader, Vec<u8>), FetchFailure> {
    let mut line = Vec::with_capacity(64);
    (&mut *reader)
        .take(MAX_HEADER_LINE as u64)
        .read_until(b'\n', &mut line)
        .await?;

    if !line.ends_with(b"\n") {
        return Err(FetchFailure::MalformedHeader(if line.len() >= MAX_HEADER_LINE {
            "header line too long".into()
        } else {
            "connection closed before end of header".into()
        }));
    }

    let header = ResponseHeader::parse(&line)?;
    let body = read_body(reader, max_body_bytes).await?;
    Ok((header, body))
}

async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    limit: usize,
) -> std::result::Result<Vec<u8>, FetchFailure> {
    let mut body = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            // Many servers close the socket without a TLS close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        if body.len() + n > limit {
            return Err(FetchFailure::BodyTooLarge(limit));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

/// Gemini client over tokio-rustls.
pub struct GeminiClient {
    connector: TlsConnector,
    timeout: Duration,
    max_body_bytes: usize,
}

impl GeminiClient {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> std::result::Result<Self, FetchFailure> {
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
            max_body_bytes,
        })
    }

    /// Perform the raw exchange under the deadline, without applying
    /// [`accept_response`].
    pub async fn request(&self, url: &Url) -> std::result::Result<FetchedDocument, FetchFailure> {
        tokio::time::timeout(self.timeout, self.exchange(url))
            .await
            .map_err(|_| FetchFailure::Timeout(self.timeout))?
    }

    async fn exchange(&self, url: &Url) -> std::result::Result<FetchedDocument, FetchFailure> {
        let (server_name, connect_host) = endpoint(url)?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        debug!(url = %url, host = %connect_host, port, "Connecting");
        let tcp = TcpStream::connect((connect_host.as_str(), port))
            .await
            .map_err(FetchFailure::Connect)?;
        let mut tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(FetchFailure::Handshake)?;

        tls.write_all(format!("{url}\r\n").as_bytes()).await?;
        tls.flush().await?;

        let peer_certificates = tls
            .get_ref()
            .1
            .peer_certificates()
            .map(<[_]>::to_vec)
            .unwrap_or_default();

        let mut reader = BufReader::new(tls);
        let (header, body) = read_response(&mut reader, self.max_body_bytes).await?;
        debug!(url = %url, status = header.status, bytes = body.len(), "Response received");

        Ok(FetchedDocument {
            url: url.clone(),
            header,
            body,
            peer_certificates,
        })
    }
}

#[async_trait]
impl Fetch for GeminiClient {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        let doc = self.request(url).await.map_err(|source| {
            warn!(url = %url, error = %source, "Fetch failed");
            Error::FetchFailed {
                url: url.to_string(),
                source,
            }
        })?;
        accept_response(doc, Utc::now())
    }
}

/// TLS server name and connect address for a URL's host.
fn endpoint(url: &Url) -> std::result::Result<(ServerName<'static>, String), FetchFailure> {
    match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => {
            let name = ServerName::try_from(domain.to_string())
                .map_err(|_| FetchFailure::ServerName(domain.to_string()))?;
            Ok((name, domain.to_string()))
        }
        Some(Host::Ipv4(ip)) => Ok((ServerName::IpAddress(IpAddr::V4(ip).into()), ip.to_string())),
        Some(Host::Ipv6(ip)) => Ok((ServerName::IpAddress(IpAddr::V6(ip).into()), ip.to_string())),
        _ => Err(FetchFailure::MissingHost),
    }
}

/// Accepts any server certificate but still checks handshake signatures.
#[derive(Debug)]
struct AnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
