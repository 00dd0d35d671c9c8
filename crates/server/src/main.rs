mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use bootstrap::Application;
use smashbot_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use smashbot_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let Application { config, db_pool, catalog, registry, ingress } =
        bootstrap::bootstrap(config).await?;

    health::spawn(
        &config.server.bind_address,
        config.server.health_check_port,
        health::HealthState::new(db_pool.clone(), catalog.len(), registry.clone()),
    )
    .await?;

    let ingress = tokio::spawn(async move {
        match ingress.run().await {
            Ok(summary) => tracing::info!(
                event_name = "system.ingress.stopped",
                correlation_id = "ingress",
                envelopes = summary.total(),
                "slack ingress stopped"
            ),
            Err(error) => tracing::error!(
                event_name = "system.ingress.failed",
                correlation_id = "ingress",
                error = %error,
                "slack ingress failed"
            ),
        }
    });
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        catalog_items = catalog.len(),
        "smashbot-server started"
    );

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        active_sessions = registry.active_count(),
        "smashbot-server stopping"
    );
    ingress.abort();

    // Live sessions observe the close and render their final message before the pool goes.
    registry.close_all();
    let grace = Duration::from_secs(config.server.graceful_shutdown_secs);
    let drained = tokio::time::timeout(grace, async {
        while registry.live_count() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            live_sessions = registry.live_count(),
            "graceful shutdown window elapsed"
        );
    }

    db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
