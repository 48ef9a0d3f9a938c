//! LedgerHub Server - Main Entry Point

use ledgerhub_api::{build_router, ApiState, ServerConfig, SessionCodec};
use ledgerhub_tenant::Tenancy;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("LedgerHub Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();

    let tenancy = Tenancy::open(config.tenancy.clone()).await?;
    let sessions = SessionCodec::new(&config.session_secret, config.session_ttl_hours);
    let state = Arc::new(ApiState::new(tenancy.clone(), sessions));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(bind = %config.bind, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tenancy.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
