//! Session-aware reverse proxy for a pool of WebDriver servers.
//!
//! Pins each session to the backend that created it and forwards all
//! session traffic there.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use session_proxy::health::start_health_server;
use session_proxy::proxy::{serve, UpstreamClient};
use session_proxy::{ProxyConfig, RoundRobinStrategy, SessionRouter, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProxyConfig::parse();

    let backends = config.backends().context("invalid backend list")?;
    let strategy = Arc::new(RoundRobinStrategy::new(backends.clone())?);
    let sessions = Arc::new(SessionStore::new());
    let router = Arc::new(
        SessionRouter::new(
            strategy,
            Arc::clone(&sessions),
            UpstreamClient::new(config.upstream()),
        )
        .with_max_body_bytes(config.max_body_bytes),
    );

    if let Some(health_port) = config.health_port {
        let host = config.host.clone();
        let sessions = Arc::clone(&sessions);
        tokio::spawn(async move {
            if let Err(e) = start_health_server((host.as_str(), health_port), sessions).await {
                tracing::error!(error = %e, port = health_port, "health server stopped");
            }
        });
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let backend_list = backends
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");
    tracing::info!(
        addr = %listener.local_addr()?,
        backends = %backend_list,
        strategy = router.strategy_name(),
        "session-proxy listening"
    );

    tokio::select! {
        result = serve(listener, router) => result.context("proxy server stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    Ok(())
}
