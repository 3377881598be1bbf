//! Error taxonomy for the proxy pipeline.
//!
//! Every variant is scoped to one request/response cycle. A reference inside
//! a document that fails to resolve is not an error here: the rewriter leaves
//! that span untouched and moves on.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` query parameter is not an absolute http(s) URL.
    #[error("invalid target URL '{input}': {reason}")]
    InvalidTarget { input: String, reason: String },

    /// Any transport failure while talking to the target origin.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The HTML document exceeds the rewrite buffer.
    #[error("upstream document exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnavailable(_) | ProxyError::BodyTooLarge { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::UpstreamUnavailable(_) => "upstream_unavailable",
            ProxyError::BodyTooLarge { .. } => "body_too_large",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts, DNS, TLS and connection resets are not distinguished.
        ProxyError::UpstreamUnavailable(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), format!("Proxy error: {self}")).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let invalid = ProxyError::InvalidTarget {
            input: "not a url".into(),
            reason: "relative URL without a base".into(),
        };
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::UpstreamUnavailable("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::BodyTooLarge { limit: 1 }.status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_response_is_plain_text() {
        let response = ProxyError::UpstreamUnavailable("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
