// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Labrange Core - Instance Lifecycle Server
//!
//! An HTTP server responsible for:
//! - Reconciling orchestrator and registry instance state into one view
//! - Idempotent instance termination with best-effort workload teardown
//! - Readiness probing of instance endpoints
//! - Flag resolution with a durable registry fallback

use std::sync::Arc;

use tracing::{info, warn};

use labrange_core::config::Config;
use labrange_core::handlers::HandlerState;
use labrange_core::server::run_http_server;
use labrange_orchestrator::OrchestratorClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labrange_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        orchestrator_url = %config.orchestrator.base_url,
        "Starting Labrange Core"
    );

    // Connect to database
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    // Create registry tables if they don't exist
    sqlx::raw_sql(include_str!("../migrations/schema.sql"))
        .execute(&pool)
        .await?;

    info!("Database schema verified");

    // Create orchestrator client
    let orchestrator = Arc::new(OrchestratorClient::new(config.orchestrator.clone())?);

    let state = Arc::new(HandlerState::new(
        pool,
        orchestrator,
        config.probe_timeout,
        config.probe_max_attempts,
    )?);

    run_http_server(config.http_addr, state).await?;

    Ok(())
}
