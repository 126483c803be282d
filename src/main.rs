//! Redis HTTP proxy.
//!
//! Lets browser pages and other HTTP-only clients read and write a Redis
//! store through plain GET requests.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                 REDIS HTTP PROXY                 │
//!                         │                                                  │
//!   GET /get?key=K        │  ┌──────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ──────────────────────┼─▶│   http   │──▶│ command  │──▶│     pool     │──┼──▶ Redis
//!                         │  │ handlers │   │ executor │   │ (bounded,    │  │
//!   {"status","data"}     │  │ + codec  │◀──│ GET/SET  │◀──│  reused)     │◀─┼───
//!   ◀─────────────────────┼──│          │   │          │   └──────┬───────┘  │
//!                         │  └──────────┘   └──────────┘          │          │
//!                         │                                ┌──────▼───────┐  │
//!                         │                                │ idle reaper  │  │
//!                         │                                └──────────────┘  │
//!                         │  config · observability · lifecycle              │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use redis_http_proxy::config::load_config;
use redis_http_proxy::http::HttpServer;
use redis_http_proxy::lifecycle::{wait_for_signal, Shutdown};
use redis_http_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "redis-http-proxy")]
#[command(about = "HTTP gateway exposing Redis GET/SET with base64 values", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted; PORT and
    /// REDIS_URL override the file either way.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("redis-http-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_total_connections = config.pool.max_total_connections,
        max_idle_connections = config.pool.max_idle_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::connect(config.clone())?;

    // A failed bind is fatal.
    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                address = %config.listener.bind_address,
                error = %e,
                "Failed to bind listener"
            );
            return Err(e.into());
        }
    };
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
