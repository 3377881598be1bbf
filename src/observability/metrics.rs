//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome
//!   (`landing`, `html`, `passthrough`, `invalid_target`, `upstream_unavailable`, `body_too_large`)
//! - `proxy_upstream_duration_seconds` (histogram): time to upstream response headers
//! - `proxy_rewritten_references_total` (counter): references by result
//!   (`rewritten`, `skipped`, `unresolved`)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::rewrite::RewriteStats;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_outcome(outcome: &'static str) {
    metrics::counter!("proxy_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_duration(started: Instant) {
    metrics::histogram!("proxy_upstream_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_rewrites(stats: &RewriteStats) {
    for (result, count) in [
        ("rewritten", stats.rewritten),
        ("skipped", stats.skipped),
        ("unresolved", stats.unresolved),
    ] {
        if count > 0 {
            metrics::counter!("proxy_rewritten_references_total", "result" => result)
                .increment(count as u64);
        }
    }
}
