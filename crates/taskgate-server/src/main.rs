//! taskgate HTTP server.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use taskgate_server::http;
use taskgate_server::{AppState, Args, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default directive
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taskgate=info,tower_http=info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load config
    let config = Config::from(Args::parse());
    let http_addr: SocketAddr = config.bind_addr.parse()?;

    info!(
        roots = ?config.sandbox.allowed_roots,
        max_file_size = config.sandbox.max_file_size,
        "Sandbox configured"
    );

    // Create shared state
    let state = AppState::from_config(&config)?;
    let router = http::create_router(state);

    let listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
