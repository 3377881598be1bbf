//! Page Relay
//!
//! A forwarding proxy that rewrites HTML so navigation stays on the proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                    PAGE RELAY                     │
//!  GET /proxy?url=…   │  ┌──────────┐   ┌──────────┐   ┌──────────────┐  │
//!  ───────────────────┼─▶│  target  │──▶│ fetcher  │──▶│   content    │  │       Origin
//!                     │  │classifier│   │ (profile)│◀──┼──────────────┼──┼────── server
//!                     │  └──────────┘   └──────────┘   └──────┬───────┘  │
//!                     │                                 html  │ other    │
//!                     │                          ┌────────────┴───┐      │
//!                     │                          ▼                ▼      │
//!                     │                   ┌────────────┐   ┌──────────┐  │
//!  ◀──────────────────┼───────────────────│  rewrite   │   │  stream  │  │
//!   composed response │                   └────────────┘   └──────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use page_relay::config::{load_config, ProxyConfig};
use page_relay::lifecycle::Shutdown;
use page_relay::observability::{logging, metrics};
use page_relay::HttpServer;

#[derive(Parser)]
#[command(name = "page-relay")]
#[command(about = "Forwarding proxy that rewrites HTML references", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("page-relay v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        route = %config.proxy.route,
        public_origin = config.proxy.public_origin.as_deref().unwrap_or("<from request>"),
        upstream_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
