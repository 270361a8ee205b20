//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Engine Configuration Constants
// ============================================================================

/// Default local (backend) database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/edgesync";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default auth-service endpoint (remote parameter service).
pub const DEFAULT_AUTH_SERVICE_ENDPOINT: &str = "http://localhost:3001";

/// Default knowledge-mining service endpoint.
pub const DEFAULT_KMINING_ENDPOINT: &str = "http://localhost:5001";

/// Default sync cadence in seconds.
pub const DEFAULT_SYNC_CADENCE_SECS: u64 = 10;

/// Default depth of the sync job queue. Ticks that arrive while an attempt
/// is running are held here instead of being dropped or run in parallel.
pub const DEFAULT_SYNC_QUEUE_DEPTH: usize = 32;

/// Default pipeline status poll interval in milliseconds.
pub const DEFAULT_PIPELINE_POLL_INTERVAL_MS: u64 = 1000;

/// Default upper bound on pipeline status poll attempts (10 minutes at the
/// default interval).
pub const DEFAULT_PIPELINE_POLL_MAX_ATTEMPTS: u32 = 600;

/// Default number of unrecognized status responses tolerated before the
/// poller gives up.
pub const DEFAULT_PIPELINE_MALFORMED_BUDGET: u32 = 3;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub runtime_node: RuntimeNodeConfig,
    pub services: ServiceConfig,
    pub sync: SyncConfig,
    pub pipeline: PipelineConfig,
}

/// Local backend database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Runtime-node (external) database configuration. Read-only from this
/// engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeNodeConfig {
    pub database_url: String,
}

/// External HTTP service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub auth_service_endpoint: String,
    pub kmining_endpoint: String,
}

/// Sync scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub cadence_secs: u64,
    pub queue_depth: usize,
}

/// Pipeline poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub malformed_budget: u32,
}

impl EngineConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = EngineConfig {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            runtime_node: RuntimeNodeConfig {
                database_url: std::env::var("RUNTIME_NODE_DATABASE_URL")
                    .unwrap_or_default(),
            },
            services: ServiceConfig {
                auth_service_endpoint: std::env::var("AUTH_SERVICE_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_AUTH_SERVICE_ENDPOINT.to_string()),
                kmining_endpoint: std::env::var("KMINING_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_KMINING_ENDPOINT.to_string()),
            },
            sync: SyncConfig {
                cadence_secs: std::env::var("SYNC_CADENCE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_CADENCE_SECS),
                queue_depth: std::env::var("SYNC_QUEUE_DEPTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SYNC_QUEUE_DEPTH),
            },
            pipeline: PipelineConfig {
                poll_interval_ms: std::env::var("PIPELINE_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PIPELINE_POLL_INTERVAL_MS),
                poll_max_attempts: std::env::var("PIPELINE_POLL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PIPELINE_POLL_MAX_ATTEMPTS),
                malformed_budget: std::env::var("PIPELINE_MALFORMED_BUDGET")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PIPELINE_MALFORMED_BUDGET),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.runtime_node.database_url.is_empty() {
            anyhow::bail!("Runtime node database URL cannot be empty (RUNTIME_NODE_DATABASE_URL)");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.services.auth_service_endpoint.is_empty() {
            anyhow::bail!("Auth service endpoint cannot be empty");
        }

        if self.services.kmining_endpoint.is_empty() {
            anyhow::bail!("Knowledge mining endpoint cannot be empty");
        }

        if self.sync.cadence_secs == 0 {
            anyhow::bail!("Sync cadence must be greater than 0 seconds");
        }

        if self.sync.queue_depth == 0 {
            anyhow::bail!("Sync queue depth must be greater than 0");
        }

        if self.pipeline.poll_interval_ms == 0 {
            anyhow::bail!("Pipeline poll interval must be greater than 0 ms");
        }

        if self.pipeline.poll_max_attempts == 0 {
            anyhow::bail!("Pipeline poll attempt bound must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            runtime_node: RuntimeNodeConfig {
                database_url: String::new(),
            },
            services: ServiceConfig {
                auth_service_endpoint: DEFAULT_AUTH_SERVICE_ENDPOINT.to_string(),
                kmining_endpoint: DEFAULT_KMINING_ENDPOINT.to_string(),
            },
            sync: SyncConfig {
                cadence_secs: DEFAULT_SYNC_CADENCE_SECS,
                queue_depth: DEFAULT_SYNC_QUEUE_DEPTH,
            },
            pipeline: PipelineConfig {
                poll_interval_ms: DEFAULT_PIPELINE_POLL_INTERVAL_MS,
                poll_max_attempts: DEFAULT_PIPELINE_POLL_MAX_ATTEMPTS,
                malformed_budget: DEFAULT_PIPELINE_MALFORMED_BUDGET,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.runtime_node.database_url = "postgresql://localhost/runtime_node".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_runtime_node_url_rejected() {
        let config = EngineConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let mut config = valid_config();
        config.sync.cadence_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_bounds_rejected() {
        let mut config = valid_config();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = valid_config();
        config.pipeline.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
