// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the orchestrator client.

use std::time::Duration;

use crate::error::{OrchestratorError, Result};

/// Orchestrator client configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base URL of the orchestrator API, e.g. `https://10.0.3.1:6443`.
    pub base_url: String,
    /// Bearer token for the internal channel, if the orchestrator requires one.
    pub token: Option<String>,
    /// Accept the orchestrator's self-signed certificate.
    ///
    /// This override applies to this client only, never to outbound traffic
    /// elsewhere in the platform.
    pub dangerous_skip_cert_verification: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl OrchestratorConfig {
    /// Create a configuration for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            dangerous_skip_cert_verification: false,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Required | Default |
    /// |----------|----------|---------|
    /// | `LABRANGE_ORCHESTRATOR_URL` | Yes | - |
    /// | `LABRANGE_ORCHESTRATOR_TOKEN` | No | unset |
    /// | `LABRANGE_ORCHESTRATOR_SKIP_CERT_VERIFICATION` | No | `false` |
    /// | `LABRANGE_ORCHESTRATOR_TIMEOUT_MS` | No | `10000` |
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("LABRANGE_ORCHESTRATOR_URL").map_err(|_| {
            OrchestratorError::Config("LABRANGE_ORCHESTRATOR_URL is not set".to_string())
        })?;

        let token = std::env::var("LABRANGE_ORCHESTRATOR_TOKEN").ok();

        let dangerous_skip_cert_verification =
            std::env::var("LABRANGE_ORCHESTRATOR_SKIP_CERT_VERIFICATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false);

        let request_timeout_ms: u64 = std::env::var("LABRANGE_ORCHESTRATOR_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|_| {
                OrchestratorError::Config(
                    "LABRANGE_ORCHESTRATOR_TIMEOUT_MS must be an integer".to_string(),
                )
            })?;

        Ok(Self {
            base_url,
            token,
            dangerous_skip_cert_verification,
            request_timeout: Duration::from_millis(request_timeout_ms),
            connect_timeout: Duration::from_secs(5),
        })
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Accept self-signed certificates on this channel.
    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.dangerous_skip_cert_verification = skip;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
