//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener
//! - Dispatch proxy requests to the pipeline
//! - Graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, request_origin, MakeRequestUuidV4, X_REQUEST_ID};
use crate::landing;
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::proxy::{Classified, FetcherError, ProxyQuery, ProxyService};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProxyService>,
    pub public_origin: Option<Arc<str>>,
}

impl AppState {
    /// Origin used when building proxy links for this request.
    fn origin_for(&self, headers: &HeaderMap, uri: &Uri) -> String {
        match &self.public_origin {
            Some(origin) => origin.to_string(),
            None => request_origin(headers, uri),
        }
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, FetcherError> {
        let service = Arc::new(ProxyService::new(&config)?);
        let state = AppState {
            service,
            public_origin: config
                .proxy
                .public_origin
                .as_deref()
                .map(|origin| Arc::from(origin.trim_end_matches('/'))),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.proxy.route, get(proxy_handler))
            .route("/healthz", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl+C, SIGTERM, or a message on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route = %self.config.proxy.route,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                    _ = signals::shutdown_signal() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Proxy entry point: landing page, or fetch-and-relay of `?url=`.
async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let request_id = request_id(&headers).to_string();
    let origin = state.origin_for(&headers, &uri);
    let query = ProxyQuery::from_raw(uri.query());

    let request = match Classified::from_query(&query, &origin) {
        Ok(Classified::Landing) => {
            metrics::record_outcome("landing");
            let route = state.service.route();
            return landing::page(route, &format!("{origin}{route}"));
        }
        Ok(Classified::Target(request)) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected proxy request");
            metrics::record_outcome(e.kind());
            return e.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        target_url = %request.target(),
        "Proxying request"
    );

    match state.service.handle(&request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                target_url = %request.target(),
                error = %e,
                "Upstream error"
            );
            metrics::record_outcome(e.kind());
            e.into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}
