//! Request classification: landing page or proxied target.

use url::{form_urlencoded, Url};

use crate::error::ProxyError;
use crate::rewrite::RewriteContext;

/// Query string accepted by the proxy route.
#[derive(Debug, Default)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

impl ProxyQuery {
    /// Pick the `url` parameter out of a raw query string.
    ///
    /// When the parameter repeats, the first occurrence wins. Other
    /// parameters are ignored.
    pub fn from_raw(query: Option<&str>) -> Self {
        let url = query.and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        });
        Self { url }
    }
}

/// What an inbound call asks for.
#[derive(Debug)]
pub enum Classified {
    /// No target: serve the landing page.
    Landing,
    /// A validated target to fetch.
    Target(ProxyRequest),
}

impl Classified {
    /// Classify an inbound call by its `url` parameter.
    ///
    /// An absent or blank parameter is a landing page request. Anything
    /// else must parse as an absolute http(s) URL.
    pub fn from_query(query: &ProxyQuery, proxy_origin: &str) -> Result<Self, ProxyError> {
        match query.url.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                ProxyRequest::parse(raw, proxy_origin).map(Classified::Target)
            }
            _ => Ok(Classified::Landing),
        }
    }
}

/// One proxied fetch. Immutable once created.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    target: Url,
    /// The parameter as the caller sent it.
    raw: String,
    proxy_origin: String,
}

impl ProxyRequest {
    pub fn parse(raw: &str, proxy_origin: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidTarget {
            input: raw.to_string(),
            reason,
        };

        let target = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", target.scheme())));
        }
        if target.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self {
            target,
            raw: raw.to_string(),
            proxy_origin: proxy_origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn proxy_origin(&self) -> &str {
        &self.proxy_origin
    }

    /// `<origin><route>?url=`
    pub fn proxy_base(&self, route: &str) -> String {
        format!("{}{}?url=", self.proxy_origin, route)
    }

    pub fn rewrite_context(&self, route: &str) -> RewriteContext {
        RewriteContext::new(self.target.clone(), self.raw.clone(), self.proxy_base(route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://relay.test";

    fn query(url: Option<&str>) -> ProxyQuery {
        ProxyQuery {
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_raw_query_first_url_wins() {
        let q = ProxyQuery::from_raw(Some("url=https%3A%2F%2Fa.test%2Fx%3Fy%3D1&url=not%20a%20url"));
        assert_eq!(q.url.as_deref(), Some("https://a.test/x?y=1"));

        let q = ProxyQuery::from_raw(Some("lang=en&url=https://b.test/&url=https://c.test/"));
        assert_eq!(q.url.as_deref(), Some("https://b.test/"));

        assert!(ProxyQuery::from_raw(Some("lang=en")).url.is_none());
        assert!(ProxyQuery::from_raw(None).url.is_none());
        assert_eq!(ProxyQuery::from_raw(Some("url=")).url.as_deref(), Some(""));
    }

    #[test]
    fn test_repeated_url_classified_by_first_value() {
        let q = ProxyQuery::from_raw(Some("url=not%20a%20url&url=https://example.com/"));
        let err = Classified::from_query(&q, ORIGIN).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidTarget { ref input, .. } if input == "not a url"));
    }

    #[test]
    fn test_landing_when_absent_or_blank() {
        assert!(matches!(
            Classified::from_query(&query(None), ORIGIN),
            Ok(Classified::Landing)
        ));
        assert!(matches!(
            Classified::from_query(&query(Some("  ")), ORIGIN),
            Ok(Classified::Landing)
        ));
    }

    #[test]
    fn test_valid_target() {
        let classified = Classified::from_query(&query(Some("https://example.com/a?b=1")), ORIGIN);
        match classified {
            Ok(Classified::Target(request)) => {
                assert_eq!(request.target().as_str(), "https://example.com/a?b=1");
                assert_eq!(request.proxy_base("/proxy"), "http://relay.test/proxy?url=");
            }
            other => panic!("unexpected classification {other:?}"),
        }
    }

    #[test]
    fn test_malformed_targets_rejected() {
        for input in [
            "not a url",
            "/relative/path",
            "example.com",
            "ftp://example.com/file",
            "javascript:alert(1)",
            "http://",
        ] {
            let err = ProxyRequest::parse(input, ORIGIN).unwrap_err();
            assert!(
                matches!(err, ProxyError::InvalidTarget { .. }),
                "{input} should be invalid"
            );
        }
    }

    #[test]
    fn test_origin_trailing_slash_trimmed() {
        let request = ProxyRequest::parse("https://example.com", "https://relay.test/").unwrap();
        assert_eq!(request.proxy_base("/proxy"), "https://relay.test/proxy?url=");
        assert_eq!(request.raw(), "https://example.com");
        assert_eq!(request.target().as_str(), "https://example.com/");
    }
}
