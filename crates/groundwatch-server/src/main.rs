//! Groundwatch backend entry point.
//!
//! This binary wires together the incident store, rate limiter,
//! broadcaster, incident service, and background tasks, then serves the
//! HTTP API and the live `WebSocket` feed until the process is
//! terminated.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `groundwatch-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect the incident store (in-memory, or `PostgreSQL` plus migrations)
//! 4. Create the broadcaster and rate limiter, spawn the limiter sweep task
//! 5. Assemble the incident service, spawn the retention task
//! 6. Serve the HTTP API and live feed

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use groundwatch_api::{AppState, start_server};
use groundwatch_broadcast::Broadcaster;
use groundwatch_core::config::{DatabaseConfig, ServiceConfig, StoreBackend};
use groundwatch_core::limiter::{RateLimiter, spawn_sweeper};
use groundwatch_db::{IncidentStore, MemoryStore, PostgresConfig, PostgresStore};
use groundwatch_service::{IncidentService, spawn_retention};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Application entry point for the Groundwatch backend.
///
/// Initializes all subsystems and serves until terminated.
///
/// # Errors
///
/// Returns an error if any initialization step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so remember whether
    //    the file was present and report that right after init.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging. `RUST_LOG` wins over the
    //    configured level when set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("groundwatch-server starting");
    if !config_found {
        warn!("groundwatch-config.yaml not found, using defaults");
    }
    info!(
        host = config.server.host,
        port = config.server.port,
        store_backend = ?config.database.backend,
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max_requests = config.rate_limit.max_requests,
        "configuration loaded"
    );

    // 3. Connect the incident store.
    let store = connect_store(&config.database).await?;

    // 4. Create the broadcaster and rate limiter, spawn the sweep task.
    let broadcaster = Arc::new(Broadcaster::new(config.realtime.queue_capacity));
    let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let _sweeper = spawn_sweeper(
        Arc::clone(&rate_limiter),
        Duration::from_secs(config.rate_limit.sweep_interval_secs),
    );
    info!(
        queue_capacity = config.realtime.queue_capacity,
        sweep_interval_secs = config.rate_limit.sweep_interval_secs,
        "broadcaster and rate limiter initialized"
    );

    // 5. Assemble the incident service and spawn the retention task.
    let service = IncidentService::new(store, Arc::clone(&broadcaster), config.analytics.clone());
    let _retention = if config.retention.enabled {
        Some(spawn_retention(service.clone(), config.retention.clone()))
    } else {
        info!("retention task disabled by config");
        None
    };

    // 6. Serve until terminated.
    let state = Arc::new(AppState::new(service, broadcaster, rate_limiter));
    start_server(&config, state)
        .await
        .map_err(StartupError::from)?;

    Ok(())
}

/// Load the service configuration from `groundwatch-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
/// When the file is absent, defaults are used with environment overrides
/// still applied; the returned flag says whether the file was found.
fn load_config() -> Result<(ServiceConfig, bool), StartupError> {
    let config_path = Path::new("groundwatch-config.yaml");
    if config_path.exists() {
        let config = ServiceConfig::from_file(config_path)?;
        Ok((config, true))
    } else {
        let mut config = ServiceConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Connect the configured incident store backend.
///
/// The memory backend needs no setup. The `PostgreSQL` backend connects
/// a pool and runs pending migrations before the store is handed out.
async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn IncidentStore>, StartupError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("using in-memory incident store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pg_config =
                PostgresConfig::new(&config.url).with_max_connections(config.max_connections);
            let store = PostgresStore::connect(&pg_config).await?;
            store.run_migrations().await?;
            info!(
                max_connections = config.max_connections,
                "postgresql incident store connected"
            );
            Ok(Arc::new(store))
        }
    }
}
