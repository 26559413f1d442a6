mod bot;
mod config;
mod db;
mod error;
mod scheduler;
mod server;

use crate::bot::{BotHandler, Notifier};
use crate::config::{Config, UnitConfig};
use crate::db::repo::Repo;
use crate::scheduler::VacancyPoller;
use anyhow::{Context, Result};
use line_client::{LineClient, LineClientConfig};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{prelude::*, EnvFilter};
use ur_client::{DanchiCode, UrClient, UrClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize variables
    let log_level = config.log_level();
    let log_dir = &config.logging.dir;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(log_dir)?;

    // Setup file appender (daily rotation)
    let file_appender = tracing_appender::rolling::daily(log_dir, "urbot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Use local time for log timestamps
    let local_timer = ChronoLocal::rfc_3339();

    // Setup stdout layer with local time
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_timer(local_timer.clone());

    // Setup file layer with local time
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(local_timer)
        .with_writer(non_blocking);

    // Filter layer based on config
    let filter_layer = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive("sqlx=warn".parse()?)
        .add_directive("sea_orm=warn".parse()?);

    // Combine layers
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Starting UR vacancy bot...");
    info!("Logs are written to: {}", log_dir);

    // Connect to database
    let db = db::establish_connection(&config.database.url).await?;

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    info!("✅ Database migrations completed");

    // Initialize repository
    let repo = Arc::new(Repo::new(db));

    // Test database connection
    repo.ping().await?;
    info!("✅ Database ping successful");

    // Seed units from configuration
    let seeded = seed_units(&repo, &config.units).await?;
    info!("✅ {} of {} unit(s) seeded", seeded, config.units.len());

    // Initialize LINE client
    let line_client = LineClient::new(LineClientConfig {
        channel_access_token: config.line.channel_access_token.clone(),
        api_base: config.line.api_base.clone(),
        timeout_secs: config.line.timeout_sec,
    })
    .context("Failed to create LINE client")?;
    info!("✅ LINE client initialized");

    // Initialize UR client
    let ur_client = UrClient::new(UrClientConfig {
        api_url: config.ur.api_url.clone(),
        site_base: config.ur.site_base.clone(),
        timeout_secs: config.ur.timeout_sec,
    })
    .context("Failed to create UR client")?;
    info!("✅ UR client initialized");

    let handler = Arc::new(BotHandler::new(
        repo.clone(),
        Notifier::new(line_client.clone()),
    ));
    let poller = Arc::new(VacancyPoller::new(
        repo.clone(),
        Notifier::new(line_client),
        ur_client,
        Duration::from_millis(config.poller.unit_delay_ms),
        config.poller.jitter_ms,
    ));

    // Spawn in-process poller if configured
    let poller_handle = config.poller.interval_sec.map(|interval_sec| {
        let poller = poller.clone();
        tokio::spawn(async move {
            poller.run(Duration::from_secs(interval_sec)).await;
        })
    });
    if poller_handle.is_none() {
        info!("No poller interval configured, polling only on GET /check-rooms");
    }

    let state = server::AppState {
        handler,
        poller,
        check_token: config.server.check_token.clone(),
    };

    // Setup Ctrl+C handler
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    };

    server::serve(&config.server.bind_addr(), state, shutdown).await?;

    if let Some(handle) = poller_handle {
        handle.abort();
    }

    info!("✅ Shutdown complete");
    Ok(())
}

/// Upsert configured units, skipping entries with an invalid danchi code.
/// Returns how many were written.
async fn seed_units(repo: &Repo, units: &[UnitConfig]) -> Result<usize> {
    let mut seeded = 0;
    for unit in units {
        if let Err(e) = unit.code.parse::<DanchiCode>() {
            warn!("Skipping unit {}: {}", unit.name, e);
            continue;
        }
        repo.upsert_unit(&unit.name, &unit.code, unit.url.clone())
            .await
            .with_context(|| format!("Failed to seed unit {}", unit.name))?;
        seeded += 1;
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::tests::setup_test_db;

    #[tokio::test]
    async fn test_seed_units_counts_only_valid_codes() {
        let repo = setup_test_db().await.unwrap();
        let units = vec![
            UnitConfig {
                name: "代々木ビュー".to_string(),
                code: "20_1310".to_string(),
                url: None,
            },
            UnitConfig {
                name: "Broken".to_string(),
                code: "yoyogi".to_string(),
                url: None,
            },
        ];

        assert_eq!(seed_units(&repo, &units).await.unwrap(), 1);
        assert!(repo.resolve_unit("代々木ビュー").await.is_ok());
        assert!(repo.resolve_unit("Broken").await.is_err());
    }
}
