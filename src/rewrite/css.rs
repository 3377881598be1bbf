//! Locates `url(...)` references in CSS text.

use std::ops::Range;

/// Byte ranges of the inner values of every `url(...)` in `css`.
///
/// Quotes and surrounding whitespace are excluded from the ranges. A token
/// that is never closed by `)` is ignored.
pub fn url_spans(css: &str) -> Vec<Range<usize>> {
    let bytes = css.as_bytes();
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(at) = find_url_open(css, pos) {
        pos = at + 4;

        // `background-url(` and friends are other functions.
        if at > 0 && is_ident_byte(bytes[at - 1]) {
            continue;
        }

        let mut i = skip_space(bytes, pos);
        let Some(&first) = bytes.get(i) else { break };

        let value = if first == b'"' || first == b'\'' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j] != first {
                if bytes[j] == b'\\' {
                    j += 1;
                }
                j += 1;
            }
            if j >= bytes.len() {
                break;
            }
            i = skip_space(bytes, j + 1);
            start..j
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b')' && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let end = i;
            i = skip_space(bytes, i);
            start..end
        };

        if bytes.get(i) == Some(&b')') {
            pos = i + 1;
            spans.push(value);
        }
    }

    spans
}

fn find_url_open(css: &str, from: usize) -> Option<usize> {
    css.as_bytes()
        .get(from..)?
        .windows(4)
        .position(|w| w.eq_ignore_ascii_case(b"url("))
        .map(|i| from + i)
}

fn skip_space(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
