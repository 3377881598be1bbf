//! Landing page served when the proxy route is called without a target.

use axum::response::Response;

use crate::http::response::html_page;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Page Relay</title>
  <style>
    body { font-family: system-ui, sans-serif; display: flex; align-items: center;
           justify-content: center; min-height: 100vh; margin: 0; background: #0b0f0d; color: #d8f5e6; }
    main { max-width: 480px; width: 100%; padding: 24px; }
    input { width: 100%; padding: 10px; box-sizing: border-box; }
    button { margin-top: 12px; width: 100%; padding: 10px; }
    .hint { margin-top: 10px; font-size: 0.85rem; text-align: center; }
  </style>
</head>
<body>
  <main>
    <h1>Page Relay</h1>
    <form id="relay-form" method="get" action="{{ROUTE}}">
      <label for="relay-url">Target URL</label>
      <input id="relay-url" type="url" name="url" placeholder="https://example.com" required>
      <button type="submit">Go</button>
    </form>
    <div class="hint">Short link: <strong>{{LINK}}</strong></div>
  </main>
</body>
</html>
"#;

/// Render the landing page. `route` is the proxy path and `link` the full
/// address of the proxy entry point shown to the user.
pub fn render(route: &str, link: &str) -> String {
    TEMPLATE
        .replace("{{ROUTE}}", &escape_html(route))
        .replace("{{LINK}}", &escape_html(link))
}

pub fn page(route: &str, link: &str) -> Response {
    html_page(render(route, link))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shows_link() {
        let html = render("/proxy", "https://relay.example.net/proxy");
        assert!(html.contains("<strong>https://relay.example.net/proxy</strong>"));
        assert!(html.contains(r#"action="/proxy""#));
        assert!(html.contains(r#"name="url""#));
    }

    #[test]
    fn test_host_header_cannot_inject_markup() {
        let html = render("/proxy", "http://evil\"><script>x</script>/proxy");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
