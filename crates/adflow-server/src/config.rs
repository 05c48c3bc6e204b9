//! Server configuration loaded from environment variables.

use std::time::Duration;

use adflow_core::asset::DEFAULT_MAX_ASSET_BYTES;
use anyhow::Context;

/// Runtime settings for the API server and its collaborators.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// PostgreSQL URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub proof_service_url: Option<String>,
    /// `None` selects the built-in rules classifier.
    pub classifier_service_url: Option<String>,
    /// Deadline for each call to the proof or classifier service.
    pub collaborator_timeout: Duration,
    /// Upload size limit in bytes.
    pub max_asset_bytes: u64,
    /// Period between health check rounds.
    pub health_check_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            cors_origins: vec!["http://localhost:5173".to_string()],
            proof_service_url: None,
            classifier_service_url: None,
            collaborator_timeout: Duration::from_secs(60),
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
            health_check_interval: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `8000`                  |
    /// | `DATABASE_URL`               | unset (in-memory)       |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `PROOF_SERVICE_URL`          | unset                   |
    /// | `CLASSIFIER_SERVICE_URL`     | unset (rules)           |
    /// | `COLLABORATOR_TIMEOUT_SECS`  | `60`                    |
    /// | `MAX_ASSET_BYTES`            | `10485760`              |
    /// | `HEALTH_CHECK_INTERVAL_SECS` | `300`                   |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => defaults.port,
        };

        let collaborator_timeout = match var("COLLABORATOR_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().with_context(|| {
                    format!("COLLABORATOR_TIMEOUT_SECS must be a whole number, got '{}'", raw)
                })?;
                anyhow::ensure!(secs > 0, "COLLABORATOR_TIMEOUT_SECS must be positive");
                Duration::from_secs(secs)
            }
            None => defaults.collaborator_timeout,
        };

        let health_check_interval = match var("HEALTH_CHECK_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().with_context(|| {
                    format!("HEALTH_CHECK_INTERVAL_SECS must be a whole number, got '{}'", raw)
                })?;
                anyhow::ensure!(secs > 0, "HEALTH_CHECK_INTERVAL_SECS must be positive");
                Duration::from_secs(secs)
            }
            None => defaults.health_check_interval,
        };

        let max_asset_bytes = match var("MAX_ASSET_BYTES") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("MAX_ASSET_BYTES must be a whole number, got '{}'", raw))?,
            None => defaults.max_asset_bytes,
        };

        let cors_origins = match var("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            database_url: var("DATABASE_URL"),
            cors_origins,
            proof_service_url: var("PROOF_SERVICE_URL"),
            classifier_service_url: var("CLASSIFIER_SERVICE_URL"),
            collaborator_timeout,
            max_asset_bytes,
            health_check_interval,
        })
    }
}
