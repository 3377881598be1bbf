//! Minimal HTML tokenizer that locates start tags and their attribute spans.
//!
//! The tokenizer does not build a tree and never allocates copies of the
//! document. It only reports byte ranges, so the rewriter can splice new
//! values into the original text and leave everything else byte-identical.
//!
//! Skipped entirely: comments, `<!DOCTYPE>`, processing instructions, end
//! tags. The contents of raw text elements (`script`, `style`, `textarea`,
//! ...) are reported as a single [`Token::RawText`] and never scanned for
//! tags.

use std::ops::Range;

/// Elements whose contents are not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Byte range of the attribute name.
    pub name: Range<usize>,
    /// Byte range of the value, excluding quotes. `None` for bare attributes.
    pub value: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lowercased tag name.
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Byte offset just past the closing `>`.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag(StartTag),
    /// Contents of a raw text element, e.g. the CSS inside `<style>`.
    RawText { element: String, range: Range<usize> },
    /// A `<!DOCTYPE ...>` declaration; `end` is just past its `>`.
    Doctype { end: usize },
}

pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    /// Set after a raw text start tag; holds the element name.
    pending_raw: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            pending_raw: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    /// Position of `needle` at or after `from`, or `None`.
    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.src.get(from..)?.find(needle).map(|i| from + i)
    }

    /// Skip past the next `>` (or to the end of input).
    fn skip_past_gt(&mut self, from: usize) {
        self.pos = self.find_from(from, ">").map_or(self.src.len(), |i| i + 1);
    }

    fn raw_text(&mut self, element: String) -> Token {
        let start = self.pos;
        let end = find_closing_tag(self.src, start, &element).unwrap_or(self.src.len());
        self.pos = end;
        Token::RawText {
            element,
            range: start..end,
        }
    }

    /// Parse a start tag beginning at `lt` (the `<`). Returns `None` for a
    /// tag that runs off the end of the document.
    fn start_tag(&mut self, lt: usize) -> Option<StartTag> {
        let bytes = self.bytes();
        let len = bytes.len();

        let name_start = lt + 1;
        let mut i = name_start;
        while i < len && !is_space(bytes[i]) && bytes[i] != b'/' && bytes[i] != b'>' {
            i += 1;
        }
        let name = self.src[name_start..i].to_ascii_lowercase();

        let mut attributes = Vec::new();
        loop {
            while i < len && (is_space(bytes[i]) || bytes[i] == b'/') {
                i += 1;
            }
            if i >= len {
                return None;
            }
            if bytes[i] == b'>' {
                return Some(StartTag {
                    name,
                    attributes,
                    end: i + 1,
                });
            }

            // Attribute name. A leading '=' belongs to the name.
            let attr_start = i;
            i += 1;
            while i < len
                && !is_space(bytes[i])
                && !matches!(bytes[i], b'/' | b'>' | b'=')
            {
                i += 1;
            }
            let name_range = attr_start..i;

            let mut j = i;
            while j < len && is_space(bytes[j]) {
                j += 1;
            }
            if j >= len || bytes[j] != b'=' {
                attributes.push(Attribute {
                    name: name_range,
                    value: None,
                });
                continue;
            }

            j += 1;
            while j < len && is_space(bytes[j]) {
                j += 1;
            }
            if j >= len {
                return None;
            }

            let value = match bytes[j] {
                quote @ (b'"' | b'\'') => {
                    let value_start = j + 1;
                    let close = bytes[value_start..].iter().position(|&b| b == quote)?;
                    i = value_start + close + 1;
                    value_start..value_start + close
                }
                b'>' => {
                    // `<a href=>`: empty unquoted value.
                    i = j;
                    j..j
                }
                _ => {
                    let value_start = j;
                    while j < len && !is_space(bytes[j]) && bytes[j] != b'>' {
                        j += 1;
                    }
                    i = j;
                    value_start..j
                }
            };

            attributes.push(Attribute {
                name: name_range,
                value: Some(value),
            });
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(element) = self.pending_raw.take() {
            return Some(self.raw_text(element));
        }

        loop {
            let lt = self.find_from(self.pos, "<")?;
            let bytes = self.bytes();
            let Some(&next) = bytes.get(lt + 1) else {
                self.pos = bytes.len();
                return None;
            };

            match next {
                b'!' => {
                    if self.src[lt..].starts_with("<!--") {
                        // "<!-->" and "<!--->" close immediately.
                        let body = lt + 4;
                        self.pos = if self.src[body..].starts_with('>') {
                            body + 1
                        } else if self.src[body..].starts_with("->") {
                            body + 2
                        } else {
                            self.find_from(body, "-->").map_or(bytes.len(), |i| i + 3)
                        };
                        continue;
                    }
                    self.skip_past_gt(lt);
                    if starts_with_ignore_case(&self.src[lt + 2..], "doctype") {
                        return Some(Token::Doctype { end: self.pos });
                    }
                }
                b'?' => self.skip_past_gt(lt),
                b'/' => self.skip_past_gt(lt),
                c if c.is_ascii_alphabetic() => match self.start_tag(lt) {
                    Some(tag) => {
                        self.pos = tag.end;
                        if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                            self.pending_raw = Some(tag.name.clone());
                        }
                        return Some(Token::StartTag(tag));
                    }
                    None => {
                        self.pos = bytes.len();
                        return None;
                    }
                },
                _ => self.pos = lt + 1,
            }
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// Offset of the `</element` that closes a raw text element.
fn find_closing_tag(src: &str, from: usize, element: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut search = from;
    while let Some(offset) = src.get(search..)?.find("</") {
        let at = search + offset;
        let name_start = at + 2;
        let name_end = name_start + element.len();
        if starts_with_ignore_case(&src[name_start..], element)
            && bytes
                .get(name_end)
                .map_or(true, |&b| is_space(b) || b == b'/' || b == b'>')
        {
            return Some(at);
        }
        search = name_start;
    }
    None
}
