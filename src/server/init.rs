//! Server initialization and run loop

use super::components::Components;
use super::loader::load_config;
use super::providers::resolve_llm_provider;
use super::shutdown::shutdown_signal_with_token;
use super::validation::validate_production_config;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vigil_core::{spawn_heartbeat, HeartbeatConfig};

/// Run the vigil server until a shutdown signal arrives
pub async fn run() -> Result<()> {
    let config = load_config()?;
    validate_production_config(&config)?;
    info!(
        mode = ?config.services.mode,
        provider = %config.llm.provider,
        "Configuration loaded"
    );

    let provider = resolve_llm_provider(&config.llm)?;
    let components = Components::build(config, provider)?;
    let config = &components.config;

    let shutdown = CancellationToken::new();

    // Expired registrations vanish on read; the sweeper only reclaims memory.
    let sweeper = components.registry.spawn_sweeper(shutdown.child_token());

    let registry = &config.registry;
    let heartbeat = spawn_heartbeat(
        components.registrar(),
        registry.service_name.clone(),
        config.server.public_url(),
        HeartbeatConfig::default()
            .with_ttl(Duration::from_secs(registry.default_ttl_secs))
            .with_interval(Duration::from_secs(registry.heartbeat_secs))
            .with_retry_every(Duration::from_secs(registry.register_retry_secs))
            .with_call_timeout(Duration::from_secs(registry.register_timeout_secs)),
        shutdown.child_token(),
    );

    let app = components.router();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_token(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    // Server stopped for a reason other than a signal
    shutdown.cancel();

    let background_timeout = Duration::from_secs(5);
    for (name, handle) in [("heartbeat", heartbeat), ("registry sweeper", sweeper)] {
        match tokio::time::timeout(background_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{} task error: {}", name, e),
            Err(_) => warn!("{} shutdown timeout", name),
        }
    }

    info!("Vigil shutdown complete");
    Ok(())
}
