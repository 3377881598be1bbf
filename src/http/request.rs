//! Request inspection.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound call
//! - Derive the public origin this service is reached at
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and echoed to the caller
//! - A configured public origin always wins over request headers
//! - Forwarded headers are trusted only for building links, never for access decisions

use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Request ID of an inbound call, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Origin (`scheme://host[:port]`) the caller used to reach this service.
pub fn request_origin(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = first_value(headers, X_FORWARDED_PROTO)
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    let host = first_value(headers, X_FORWARDED_HOST)
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}", scheme.to_ascii_lowercase(), host)
}

/// First entry of a possibly comma-separated header.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_origin_from_host() {
        let uri: Uri = "/proxy?url=x".parse().unwrap();
        let origin = request_origin(&headers(&[("host", "relay.test:8080")]), &uri);
        assert_eq!(origin, "http://relay.test:8080");
    }

    #[test]
    fn test_forwarded_headers_win() {
        let uri: Uri = "/proxy".parse().unwrap();
        let origin = request_origin(
            &headers(&[
                ("host", "10.0.0.5:8080"),
                ("x-forwarded-proto", "HTTPS, http"),
                ("x-forwarded-host", "relay.example.net"),
            ]),
            &uri,
        );
        assert_eq!(origin, "https://relay.example.net");
    }

    #[test]
    fn test_absolute_form_uri_fallback() {
        let uri: Uri = "https://relay.example.net/proxy".parse().unwrap();
        assert_eq!(
            request_origin(&HeaderMap::new(), &uri),
            "https://relay.example.net"
        );
        let relative: Uri = "/proxy".parse().unwrap();
        assert_eq!(request_origin(&HeaderMap::new(), &relative), "http://localhost");
    }

    #[test]
    fn test_request_id_generation() {
        let request = Request::builder().body(()).unwrap();
        let id = MakeRequestUuidV4.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
        assert_eq!(request_id(&HeaderMap::new()), "unknown");
    }
}
