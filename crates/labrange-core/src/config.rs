// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for labrange-core.

use std::net::SocketAddr;
use std::time::Duration;

use labrange_orchestrator::OrchestratorConfig;

/// Core configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string for the instance registry.
    pub database_url: String,
    /// HTTP bind address for the API server.
    pub http_addr: SocketAddr,
    /// Orchestrator client configuration.
    pub orchestrator: OrchestratorConfig,
    /// Maximum readiness probe attempts per request.
    pub probe_max_attempts: u32,
    /// Per-attempt timeout for readiness probes.
    pub probe_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("LABRANGE_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("LABRANGE_DATABASE_URL or DATABASE_URL"))?;

        let port: u16 = std::env::var("LABRANGE_HTTP_PORT")
            .unwrap_or_else(|_| "8088".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let orchestrator = OrchestratorConfig::from_env()
            .map_err(|e| ConfigError::Orchestrator(e.to_string()))?;

        let probe_max_attempts: u32 = std::env::var("LABRANGE_PROBE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LABRANGE_PROBE_MAX_ATTEMPTS"))?;

        let probe_timeout_ms: u64 = std::env::var("LABRANGE_PROBE_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LABRANGE_PROBE_TIMEOUT_MS"))?;

        Ok(Self {
            database_url,
            http_addr,
            orchestrator,
            probe_max_attempts,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// An environment variable holds an unparsable value.
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
    /// Orchestrator client configuration failed to load.
    #[error("Orchestrator configuration error: {0}")]
    Orchestrator(String),
}
