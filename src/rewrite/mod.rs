//! Reference rewriting for proxied HTML documents.
//!
//! # Data Flow
//! ```text
//! buffered HTML text
//!     → tokenizer.rs (start tags, attribute spans, <style> text)
//!     → css.rs (url(...) spans inside <style> and style="...")
//!     → per span: skip / resolve against the page URL / replace
//!     → <base href> injected after the opening <head>
//!     → spliced output + RewriteStats
//! ```
//!
//! # Design Decisions
//! - Only value bytes are replaced; quotes, attribute order and all other
//!   markup stay byte-identical
//! - A reference that fails to resolve is left as written
//! - Inline scripts are never rewritten
//! - Not idempotent: rewriting rewritten output prefixes references again

pub mod css;
pub mod entities;
pub mod tokenizer;

use std::ops::Range;

use url::Url;

use self::tokenizer::{Token, Tokenizer};

/// The syntactic position a reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Href,
    Src,
    Action,
    CssUrl,
}

impl ReferenceKind {
    /// Map an attribute name to the reference it carries, if any.
    pub fn from_attribute(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("href") {
            Some(ReferenceKind::Href)
        } else if name.eq_ignore_ascii_case("src") {
            Some(ReferenceKind::Src)
        } else if name.eq_ignore_ascii_case("action") {
            Some(ReferenceKind::Action)
        } else {
            None
        }
    }

    /// Form actions are always routed through the proxy.
    fn honours_skip_list(self) -> bool {
        !matches!(self, ReferenceKind::Action)
    }
}

/// Outcome of rewriting a single reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Non-fetchable or empty; left as written.
    Skipped,
    /// Malformed; left as written.
    Unresolved,
    /// Replacement value pointing back at the proxy.
    Rewritten(String),
}

/// Counters collected during one rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub rewritten: usize,
    pub skipped: usize,
    pub unresolved: usize,
}

impl RewriteStats {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Skipped => self.skipped += 1,
            Resolution::Unresolved => self.unresolved += 1,
            Resolution::Rewritten(_) => self.rewritten += 1,
        }
    }
}

/// Read-only inputs of one rewrite pass, derived once per request.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Resolution base for relative references.
    page_url: Url,
    /// The target URL as requested; becomes the injected `<base href>`.
    base_href: String,
    /// `<origin><route>?url=`
    proxy_base: String,
}

impl RewriteContext {
    pub fn new(page_url: Url, base_href: impl Into<String>, proxy_base: impl Into<String>) -> Self {
        Self {
            page_url,
            base_href: base_href.into(),
            proxy_base: proxy_base.into(),
        }
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// Proxy address for an absolute URL.
    pub fn proxied(&self, absolute: &Url) -> String {
        format!("{}{}", self.proxy_base, urlencoding::encode(absolute.as_str()))
    }

    /// Apply the skip/resolve/replace rule to one reference value.
    pub fn resolve(&self, kind: ReferenceKind, value: &str) -> Resolution {
        let value = value.trim_matches(|c: char| c.is_ascii_whitespace());
        if value.is_empty() {
            return Resolution::Skipped;
        }
        if kind.honours_skip_list() && is_unfetchable(value) {
            return Resolution::Skipped;
        }
        match self.page_url.join(value) {
            Ok(absolute) => Resolution::Rewritten(self.proxied(&absolute)),
            Err(_) => Resolution::Unresolved,
        }
    }
}

fn is_unfetchable(value: &str) -> bool {
    if value.starts_with('#') {
        return true;
    }
    ["javascript:", "mailto:", "data:"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// A rewritten document and what happened to its references.
#[derive(Debug, Clone)]
pub struct RewrittenDocument {
    pub html: String,
    pub stats: RewriteStats,
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// Collects replacements while the tokenizer walks the document.
struct Rewriter<'a> {
    html: &'a str,
    ctx: &'a RewriteContext,
    edits: Vec<Edit>,
    stats: RewriteStats,
}

impl Rewriter<'_> {
    fn reference(&mut self, kind: ReferenceKind, range: Range<usize>, value: &str) {
        let resolution = self.ctx.resolve(kind, value);
        self.stats.record(&resolution);
        if let Resolution::Rewritten(replacement) = resolution {
            self.edits.push(Edit { range, replacement });
        }
    }

    fn attribute(&mut self, name: &str, range: Range<usize>) {
        let html = self.html;
        let raw = &html[range.clone()];
        if name.eq_ignore_ascii_case("style") {
            self.css(range, true);
        } else if let Some(kind) = ReferenceKind::from_attribute(name) {
            let value = entities::decode(raw);
            self.reference(kind, range, &value);
        }
    }

    /// Rewrite `url(...)` values in CSS. Inside an attribute the value may
    /// carry character references, including encoded quotes.
    fn css(&mut self, range: Range<usize>, in_attribute: bool) {
        let html = self.html;
        for span in css::url_spans(&html[range.clone()]) {
            let absolute = range.start + span.start..range.start + span.end;
            let raw = &html[absolute.clone()];
            if in_attribute {
                let decoded = entities::decode(raw);
                let value = strip_quotes(&decoded).to_string();
                self.reference(ReferenceKind::CssUrl, absolute, &value);
            } else {
                self.reference(ReferenceKind::CssUrl, absolute, raw);
            }
        }
    }

    fn finish(mut self, base_at: usize) -> RewrittenDocument {
        self.edits.push(Edit {
            range: base_at..base_at,
            replacement: format!(
                r#"<base href="{}">"#,
                entities::escape_attribute(&self.ctx.base_href)
            ),
        });
        // Stable: the insertion never shares a start with a replacement.
        self.edits.sort_by_key(|edit| edit.range.start);

        let extra: usize = self.edits.iter().map(|e| e.replacement.len()).sum();
        let mut html = String::with_capacity(self.html.len() + extra);
        let mut cursor = 0;
        for edit in &self.edits {
            html.push_str(&self.html[cursor..edit.range.start]);
            html.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        html.push_str(&self.html[cursor..]);

        RewrittenDocument {
            html,
            stats: self.stats,
        }
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Rewrite every `href`, `src`, `action` and CSS `url(...)` reference in
/// `html` so it routes through the proxy, and inject a `<base>` element.
///
/// The base element goes right after the first `<head>` start tag. Documents
/// without one get it after `<html>`, else after the doctype, else at the
/// very start.
pub fn rewrite_document(html: &str, ctx: &RewriteContext) -> RewrittenDocument {
    let mut rewriter = Rewriter {
        html,
        ctx,
        edits: Vec::new(),
        stats: RewriteStats::default(),
    };
    let mut head_end = None;
    let mut html_end = None;
    let mut doctype_end = None;

    for token in Tokenizer::new(html) {
        match token {
            Token::Doctype { end } => {
                doctype_end.get_or_insert(end);
            }
            Token::StartTag(tag) => {
                match tag.name.as_str() {
                    "head" => {
                        head_end.get_or_insert(tag.end);
                    }
                    "html" => {
                        html_end.get_or_insert(tag.end);
                    }
                    _ => {}
                }
                for attr in tag.attributes {
                    if let Some(value) = attr.value {
                        rewriter.attribute(&html[attr.name], value);
                    }
                }
            }
            Token::RawText { element, range } if element == "style" => {
                rewriter.css(range, false);
            }
            Token::RawText { .. } => {}
        }
    }

    let base_at = head_end.or(html_end).or(doctype_end).unwrap_or(0);
    rewriter.finish(base_at)
}
