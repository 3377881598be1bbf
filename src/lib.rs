//! Transparent forwarding proxy with embedded-resource rewriting.
//!
//! Fetches a target URL on the caller's behalf. HTML documents have every
//! link, resource and CSS `url(...)` reference rewritten to route back
//! through the proxy; everything else is streamed unmodified.

pub mod config;
pub mod error;
pub mod http;
pub mod landing;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod rewrite;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::{rewrite_document, RewriteContext};
