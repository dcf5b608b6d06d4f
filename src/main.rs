//! Storefront relay.
//!
//! Keeps merchant client secrets and the license vendor API key server-side
//! while giving the browser plugin a uniform, CORS-enabled JSON interface.
//!
//! ```text
//!     Browser plugin                       ┌──────────────────────────────┐
//!     ─────────────── POST /api/... ──────▶│ http (axum, cors, request id) │
//!                                          └──────────────┬───────────────┘
//!                                                         ▼
//!                                          ┌──────────────────────────────┐
//!                                          │ relay                        │
//!                                          │  token | admin_api | license │──── one call ──▶ Admin API /
//!                                          └──────────────────────────────┘                 license API
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_relay::config::load_config;
use storefront_relay::observability::{logging, metrics};
use storefront_relay::HttpServer;

#[derive(Parser)]
#[command(name = "storefront-relay")]
#[command(about = "Credential-hiding relay for the storefront design plugin", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!("storefront-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        admin_api_version = %config.upstream.admin_api_version,
        upstream_scheme = %config.upstream.scheme,
        "Configuration loaded"
    );
    if config.license.api_key.is_none() {
        tracing::warn!(
            env = %config.license.api_key_env,
            "License API key not set; license checks will report a configuration error"
        );
    }

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

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
