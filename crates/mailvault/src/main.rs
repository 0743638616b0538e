//! `mailvault` - Outlook mailbox credential vault
//!
//! Stores mailbox credentials in `SQLite`, proxies mail retrieval to the remote
//! gateway and serves a token-gated JSON API.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mailvault_core::{Services, SessionIssuer, TagRepository, db};
use mailvault_gateway::GatewayClient;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mailvault {}", env!("CARGO_PKG_VERSION"));
    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database))?;

    let seeded = TagRepository::new(pool.clone())
        .seed_defaults()
        .await
        .context("failed to create default tags")?;
    if seeded > 0 {
        info!("Created {seeded} default tags");
    }

    let gateway = GatewayClient::new(&config.gateway_config())
        .context("invalid mail gateway configuration")?;
    let batch = config.batch_settings();
    if batch.skip_validation {
        warn!("Gateway validation of new credentials is disabled");
    }

    let services = Services::new(pool, Arc::new(gateway), batch);
    let sessions = SessionIssuer::new(&config.session_settings(), services.audit.clone());
    let app = api::router(AppState::new(services, sessions), &config.allowed_origins());

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen))?;
    info!("Listening on {}", config.listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
