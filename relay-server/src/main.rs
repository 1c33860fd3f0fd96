use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::{config::Config, create_routes, presence::PresenceRegistry, spawn_lease_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting word relay presence service...");

    let config = Config::from_env().context("invalid server configuration")?;
    let registry = Arc::new(PresenceRegistry::new(config.lease_ttl));
    info!(
        "Presence leases expire after {:?}; calls without clientId use the legacy counter",
        config.lease_ttl
    );

    let routes = create_routes(registry.clone());

    // Start lease sweep task
    spawn_lease_sweeper(registry.clone(), config.sweep_interval);

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown((config.host, config.port), shutdown_signal())
        .context("failed to bind presence service")?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
    Ok(())
}

// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) else {
            tracing::error!("Failed to install signal handlers; falling back to Ctrl+C");
            let _ = signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
