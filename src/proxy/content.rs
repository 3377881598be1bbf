//! Content classification of upstream responses.

use axum::http::HeaderValue;

/// How an upstream body is served back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Buffered and run through the reference rewriter.
    Html,
    /// Streamed unmodified.
    Passthrough,
}

impl ContentKind {
    /// Anything declaring the `text/html` media type is rewritten; a missing
    /// or unreadable content type is passed through.
    pub fn classify(content_type: Option<&HeaderValue>) -> Self {
        let is_html = content_type
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));

        if is_html {
            ContentKind::Html
        } else {
            ContentKind::Passthrough
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Passthrough => "passthrough",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(value: &str) -> ContentKind {
        ContentKind::classify(Some(&HeaderValue::from_str(value).unwrap()))
    }

    #[test]
    fn test_html_variants() {
        assert_eq!(classify("text/html"), ContentKind::Html);
        assert_eq!(classify("text/html; charset=ISO-8859-1"), ContentKind::Html);
        assert_eq!(classify("Text/HTML;charset=utf-8"), ContentKind::Html);
    }

    #[test]
    fn test_everything_else_passes_through() {
        assert_eq!(classify("image/png"), ContentKind::Passthrough);
        assert_eq!(classify("text/css"), ContentKind::Passthrough);
        assert_eq!(classify("application/xhtml+xml"), ContentKind::Passthrough);
        assert_eq!(ContentKind::classify(None), ContentKind::Passthrough);
    }
}
