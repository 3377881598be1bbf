//! Response composition.
//!
//! # Responsibilities
//! - Echo the upstream status on both branches
//! - Re-emit only a whitelisted header set (content type, CORS, cache policy)
//! - Stream passthrough bodies without buffering
//!
//! # Design Decisions
//! - Passthrough is addressed by absolute upstream URL, so it is publicly cacheable
//! - Rewritten HTML embeds this service's origin and live upstream state: never cached
//! - Error responses are rendered by `ProxyError`

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

use crate::proxy::UpstreamResponse;

const OCTET_STREAM: &str = "application/octet-stream";
const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Relay a non-HTML upstream response.
pub fn passthrough(upstream: UpstreamResponse, max_age_secs: u64) -> Response {
    let status = upstream.status();
    let content_type = upstream.content_type().cloned()
        .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM));
    let cache_control = HeaderValue::from_str(&format!("public, max-age={max_age_secs}"))
        .unwrap_or(HeaderValue::from_static("public, max-age=3600"));

    let mut response = Response::new(Body::from_stream(upstream.into_stream()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::CACHE_CONTROL, cache_control);
    response
}

/// Serve a rewritten HTML document.
pub fn rewritten_html(status: StatusCode, html: String) -> Response {
    let mut response = Response::new(Body::from(html));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Serve a locally generated HTML page (the landing page).
pub fn html_page(html: String) -> Response {
    let mut response = Response::new(Body::from(html));
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rewritten_html_headers() {
        let response = rewritten_html(StatusCode::NOT_FOUND, "<p>gone</p>".into());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<p>gone</p>");
    }

    #[test]
    fn test_html_page_is_not_marked_cross_origin() {
        let response = html_page("<p>hi</p>".into());
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
