// ABOUTME: CLI entry point for the chatbridge gateway server binary
// ABOUTME: Parses arguments, binds with port fallback, and starts the axum HTTP server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chatbridge::config::GatewayConfig;
use chatbridge::signing::{HelperSigner, SharedSigner};
use chatbridge::types::GatewayError;
use clap::Parser;
use tokio::net::TcpListener;

use chatbridge_server::router;
use chatbridge_server::state::ServerState;

/// Ports probed past the requested one before giving up
const PORT_FALLBACK_RANGE: u16 = 16;

/// chatbridge-server — OpenAI-compatible gateway over a single upstream chat service
#[derive(Parser)]
#[command(name = "chatbridge-server", version, about)]
struct Cli {
    /// HTTP listen port; the next free port is used when taken
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// HTTP listen host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Public base URL for self-hosted asset links (defaults to http://localhost:{port})
    #[arg(long)]
    base_url: Option<String>,

    /// Directory transient image assets are written to
    #[arg(long, default_value = "images")]
    image_dir: PathBuf,

    /// Token-signing helper command invoked per upstream request
    #[arg(long, default_value = "token-helper")]
    signer_cmd: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let (listener, port) = bind_with_fallback(&cli.host, cli.port).await?;

    let base_url = cli
        .base_url
        .unwrap_or_else(|| format!("http://localhost:{port}"));
    let config = Arc::new(GatewayConfig::new(base_url).with_image_dir(cli.image_dir));

    let signer: SharedSigner = Arc::new(HelperSigner::new(cli.signer_cmd));
    let state = Arc::new(ServerState::new(Arc::clone(&config), signer));
    let app = router::build(state);

    tracing::info!(
        host = %cli.host,
        port,
        public_base_url = %config.public_base_url,
        "Starting chatbridge gateway server"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::internal(format!("Server error: {e}")))?;

    Ok(())
}

/// Bind the listener, scanning forward when the requested port is taken
///
/// Returns the listener together with the port actually bound.
async fn bind_with_fallback(host: &str, port: u16) -> Result<(TcpListener, u16), GatewayError> {
    for candidate in port..port.saturating_add(PORT_FALLBACK_RANGE) {
        let addr = format!("{host}:{candidate}");
        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                if candidate != port {
                    tracing::warn!(requested = port, bound = candidate, "Port was taken");
                }
                return Ok((listener, candidate));
            }
            Err(e) if e.kind() == IoErrorKind::AddrInUse => continue,
            Err(e) => return Err(GatewayError::internal(format!("Failed to bind {addr}: {e}"))),
        }
    }
    Err(GatewayError::internal(format!(
        "No free port in {port}..{}",
        port.saturating_add(PORT_FALLBACK_RANGE)
    )))
}
