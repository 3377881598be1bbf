//! Upstream fetcher.
//!
//! # Responsibilities
//! - Build one outbound client at startup (timeouts, redirects, decompression)
//! - Bound the wait for response headers and for buffered HTML bodies, but
//!   never the lifetime of a streamed passthrough body
//! - Present a fixed browser header profile to every origin
//! - Collapse every transport failure into `UpstreamUnavailable`
//!
//! # Design Decisions
//! - The profile is an immutable value built from config, never mutated per call
//! - No inbound headers are forwarded; the caller's identity never leaks upstream
//! - No retries: a failed fetch fails the request and the caller may re-submit

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::Stream;
use reqwest::redirect::Policy;
use tokio::time::timeout;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

/// Header set that imitates an ordinary browser.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    user_agent: HeaderValue,
    accept: HeaderValue,
    accept_language: HeaderValue,
    accept_encoding: HeaderValue,
}

impl BrowserProfile {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            user_agent: HeaderValue::from_str(&config.user_agent)?,
            accept: HeaderValue::from_str(&config.accept)?,
            accept_language: HeaderValue::from_str(&config.accept_language)?,
            accept_encoding: HeaderValue::from_str(&config.accept_encoding)?,
        })
    }

    /// Headers for a request to `target`. `Referer` is the target itself and
    /// `Origin` is the target's origin.
    pub fn headers_for(&self, target: &Url) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(6);
        headers.insert(header::USER_AGENT, self.user_agent.clone());
        headers.insert(header::ACCEPT, self.accept.clone());
        headers.insert(header::ACCEPT_LANGUAGE, self.accept_language.clone());
        headers.insert(header::ACCEPT_ENCODING, self.accept_encoding.clone());
        // Url serializations are ASCII, so these only fail on exotic input.
        if let Ok(referer) = HeaderValue::from_str(target.as_str()) {
            headers.insert(header::REFERER, referer);
        }
        if let Ok(origin) = HeaderValue::from_str(&target.origin().ascii_serialization()) {
            headers.insert(header::ORIGIN, origin);
        }
        headers
    }
}

/// Error building the fetcher at startup.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    #[error("invalid browser profile header: {0}")]
    Header(#[from] header::InvalidHeaderValue),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Issues outbound GET requests on behalf of callers.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
    profile: BrowserProfile,
    request_timeout: Duration,
}

impl UpstreamFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetcherError> {
        let profile = BrowserProfile::from_config(config)?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            // Per-read idle limit. A total timeout here would also cut off
            // passthrough bodies that are still streaming to the caller.
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            profile,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    /// Fetch `target`. Resolves once response headers arrive; the body is
    /// consumed later by the caller.
    ///
    /// Waiting for headers (redirects included) is bounded by
    /// `request_timeout_secs`.
    pub async fn fetch(&self, target: &Url) -> Result<UpstreamResponse, ProxyError> {
        let send = self
            .client
            .get(target.clone())
            .headers(self.profile.headers_for(target))
            .send();
        let response = timeout(self.request_timeout, send)
            .await
            .map_err(|_| timed_out("response headers", self.request_timeout))??;

        Ok(UpstreamResponse::new(response, self.request_timeout))
    }
}

/// A live upstream response, owned by one request.
#[derive(Debug)]
pub struct UpstreamResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    /// Limit on buffering the whole body in `text_limited`.
    buffer_timeout: Duration,
    inner: reqwest::Response,
}

impl UpstreamResponse {
    fn new(inner: reqwest::Response, buffer_timeout: Duration) -> Self {
        Self {
            status: inner.status(),
            content_type: inner.headers().get(header::CONTENT_TYPE).cloned(),
            buffer_timeout,
            inner,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The body as a stream of chunks, without buffering.
    ///
    /// Only the per-read idle limit applies; the stream may run for as long
    /// as the origin keeps sending.
    pub fn into_stream(
        self,
    ) -> impl Stream<Item = Result<axum::body::Bytes, reqwest::Error>> + Send + 'static {
        self.inner.bytes_stream()
    }

    /// Buffer the whole body as text, failing once it exceeds `limit` bytes
    /// or takes longer than the fetcher's request timeout.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub async fn text_limited(mut self, limit: usize) -> Result<String, ProxyError> {
        if self
            .inner
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(ProxyError::BodyTooLarge { limit });
        }

        let budget = self.buffer_timeout;
        let buf = timeout(budget, read_capped(&mut self.inner, limit))
            .await
            .map_err(|_| timed_out("response body", budget))??;

        Ok(match String::from_utf8(buf) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

async fn read_capped(inner: &mut reqwest::Response, limit: usize) -> Result<Vec<u8>, ProxyError> {
    let mut buf = Vec::new();
    while let Some(chunk) = inner.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(ProxyError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn timed_out(stage: &str, after: Duration) -> ProxyError {
    ProxyError::UpstreamUnavailable(format!("{stage} timed out after {}s", after.as_secs()))
}
