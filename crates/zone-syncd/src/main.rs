//! Zone sync daemon
//!
//! Discovers managed clusters from the hub and keeps the zone store in line
//! with them, serving health, metrics and a manual sync trigger over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zone_sync_lib::{
    health::HealthRegistry,
    hub::{HubError, KubeHubSource},
    observability::{StructuredLogger, SyncMetrics},
    sync::SyncSchedulerBuilder,
    zone::InMemoryZoneStore,
};
use zone_syncd::{api, config::DaemonConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting zone-syncd");

    let config = DaemonConfig::load()?;
    info!(
        instance = %config.instance_name,
        store_path = %config.store_path.display(),
        "Daemon configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    // Register metrics before the first scrape
    SyncMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(
        VERSION,
        &config.sync.hub_namespace,
        config.sync.interval_secs,
    );

    let store = Arc::new(
        InMemoryZoneStore::with_persistence(&config.store_path)
            .context("Failed to open zone store")?,
    );

    let source = KubeHubSource::try_default(config.sync.hub_namespace.clone())
        .await
        .context("Failed to connect to the hub cluster")?;

    if config.check_hub_on_startup {
        match source.check_installed().await {
            Ok(()) => {}
            Err(e @ HubError::NotInstalled(_)) => {
                warn!(error = %e, "Hub does not look installed, cycles will fail until it is");
            }
            Err(e) => warn!(error = %e, "Hub check failed"),
        }
    }

    let scheduler = SyncSchedulerBuilder::new()
        .source(Arc::new(source))
        .store(store)
        .config(config.sync.clone())
        .health(health_registry.clone())
        .logger(logger.clone())
        .build()?;

    let (shutdown_tx, _) = broadcast::channel(1);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        scheduler.clone(),
    ));
    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    scheduler.start(shutdown_tx.subscribe()).await?;
    health_registry.set_ready(true).await;

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    scheduler.stop().await;

    match api_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Admin API server failed"),
        Err(e) => error!(error = %e, "Admin API task panicked"),
    }

    info!("Shutdown complete");
    Ok(())
}
