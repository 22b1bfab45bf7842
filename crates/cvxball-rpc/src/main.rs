//! cvxball RPC server - smallest enclosing ball over the Arrow array transport.
//!
//! Clients PUT an `input` point matrix under a command token and GET back
//! `radius`, `midpoint` and `points` for the same token.

use anyhow::Result;
use clap::Parser;
use cvxball_core::{ServerConfig, TransportConfig, TransportServer};
use cvxball_solver::ball_compute;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "cvxball-rpc")]
#[command(about = "Smallest enclosing ball server")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = TransportConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = TransportConfig::DEFAULT_HOST)]
    host: String,

    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = TransportConfig::DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// `--debug` wins; otherwise `RUST_LOG` is honoured, falling back to `info`.
fn log_filter(debug: bool, directives: Option<&str>) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    FmtSubscriber::builder()
        .with_env_filter(log_filter(args.debug, directives.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting cvxball RPC server");

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_body_bytes: args.max_body_bytes,
    };

    let server = Arc::new(TransportServer::new(ball_compute));
    let handle = server.serve(&config).await?;

    // Print port for supervising processes to read (intentional stdout)
    println!("RPC_PORT={}", handle.addr().port());

    info!("RPC server running on {}", handle.addr());

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    handle.stop().await;

    Ok(())
}
