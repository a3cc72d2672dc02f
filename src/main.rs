// src/main.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use rust_healthcheck::{
    config,
    health::HealthCheckBuilder,
    probes,
    server::{HealthHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_healthcheck=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    let health = Arc::new(
        HealthCheckBuilder::from_config(&config.check)
            .context("Failed to initialize metrics")?
            .build(),
    );

    // One connection pool for every HTTP probe
    let client = reqwest::Client::new();
    for probe in &config.probes {
        health
            .add_arc(&probe.name, &probe.notes, probes::from_config(probe, &client))
            .with_context(|| format!("Failed to register probe {}", probe.name))?;
    }

    info!(
        "Registered {} checks (timeout {:?}, background: {})",
        health.registry().len(),
        health.timeout(),
        health.is_background()
    );

    health.start();

    let handler = HealthHandler::new(health.clone())
        .with_paths(&config.server.health_path, &config.server.metrics_path);

    let served = ServerBuilder::new(config.server.listen)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await;

    health.shutdown().await;

    if let Err(e) = &served {
        error!("Server error: {:#}", e);
    }
    served
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
