//! Proxy pipeline.
//!
//! # Data Flow
//! ```text
//! GET <route>?url=...
//!     → target.rs (landing page or validated ProxyRequest)
//!     → fetcher.rs (outbound GET with the browser profile)
//!     → content.rs (html or passthrough)
//!         html:        buffer → rewrite::rewrite_document
//!         passthrough: stream the body as-is
//!     → http::response (status, headers, caching policy)
//! ```
//!
//! # Design Decisions
//! - Stateless per request: nothing survives past response delivery
//! - Errors are scoped to one request and rendered by `ProxyError`
//! - Only GET is proxied; methods and request bodies are not forwarded

pub mod content;
pub mod fetcher;
pub mod target;

use std::time::Instant;

use axum::response::Response;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::response;
use crate::observability::metrics;
use crate::rewrite::rewrite_document;

pub use content::ContentKind;
pub use fetcher::{BrowserProfile, FetcherError, UpstreamFetcher, UpstreamResponse};
pub use target::{Classified, ProxyQuery, ProxyRequest};

/// Runs the fetch → classify → rewrite → compose stages for one request.
#[derive(Debug, Clone)]
pub struct ProxyService {
    fetcher: UpstreamFetcher,
    route: String,
    passthrough_max_age_secs: u64,
    max_html_bytes: usize,
}

impl ProxyService {
    pub fn new(config: &ProxyConfig) -> Result<Self, FetcherError> {
        Ok(Self {
            fetcher: UpstreamFetcher::new(&config.upstream)?,
            route: config.proxy.route.clone(),
            passthrough_max_age_secs: config.proxy.passthrough_max_age_secs,
            max_html_bytes: config.proxy.max_html_bytes,
        })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Fetch the target and compose the response for the caller.
    pub async fn handle(&self, request: &ProxyRequest) -> Result<Response, ProxyError> {
        let started = Instant::now();
        let upstream = self.fetcher.fetch(request.target()).await?;
        metrics::record_upstream_duration(started);

        let kind = ContentKind::classify(upstream.content_type());
        tracing::debug!(
            target_url = %request.target(),
            status = %upstream.status(),
            kind = kind.as_str(),
            "Upstream responded"
        );

        let response = match kind {
            ContentKind::Passthrough => {
                response::passthrough(upstream, self.passthrough_max_age_secs)
            }
            ContentKind::Html => {
                let status = upstream.status();
                let text = upstream.text_limited(self.max_html_bytes).await?;
                let document = rewrite_document(&text, &request.rewrite_context(&self.route));

                tracing::debug!(
                    target_url = %request.target(),
                    rewritten = document.stats.rewritten,
                    skipped = document.stats.skipped,
                    unresolved = document.stats.unresolved,
                    "Document rewritten"
                );
                metrics::record_rewrites(&document.stats);

                response::rewritten_html(status, document.html)
            }
        };

        metrics::record_outcome(kind.as_str());
        Ok(response)
    }
}
