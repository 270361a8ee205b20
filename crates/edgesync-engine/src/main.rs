//! EdgeSync Engine - Main entry point

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use edgesync_common::logging::{init_logging, LogConfig};
use edgesync_engine::{
    config::EngineConfig,
    params::ParamsClient,
    scheduler::SyncScheduler,
    source::RuntimeNodeSource,
    store::PgAssetStore,
    sync::SyncEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .filter_directives("edgesync_engine=debug,sqlx=info".to_string())
        .build();
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting EdgeSync engine");

    // Load configuration
    let config = EngineConfig::load()?;
    info!(
        cadence_secs = config.sync.cadence_secs,
        "Configuration loaded"
    );

    // Local backend database pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;
    info!("Backend database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    // Runtime-node database pool (read-only from this engine's perspective)
    let runtime_node_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.runtime_node.database_url)
        .await?;
    info!("Runtime node connection pool established");

    // Wire the engine: remote gate, fetcher, store
    let params = ParamsClient::new(config.services.auth_service_endpoint.clone())?;
    let source = RuntimeNodeSource::new(runtime_node_pool);
    let store = PgAssetStore::new(db_pool);
    let engine = SyncEngine::new(params, source, store);

    let scheduler = SyncScheduler::new(
        engine,
        Duration::from_secs(config.sync.cadence_secs),
        config.sync.queue_depth,
    );
    let handle = scheduler.start();
    info!("Sync scheduler started");

    // Run until interrupted
    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping scheduler");

    handle.shutdown().await;
    info!("EdgeSync engine stopped");

    Ok(())
}
