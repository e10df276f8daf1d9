// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Labrange Orchestrator Client
//!
//! Thin HTTP client for the container orchestrator that schedules per-user
//! challenge instances. The orchestrator lives on an internal network path,
//! frequently behind a self-signed certificate, and its response contract has
//! drifted informally over time — this crate absorbs both problems so callers
//! see a small, typed API:
//!
//! - Workload lifecycle: [`OrchestratorClient::list_workloads`],
//!   [`OrchestratorClient::create_workload`],
//!   [`OrchestratorClient::delete_workload`],
//!   [`OrchestratorClient::restart_workload`]
//! - Secret retrieval: [`OrchestratorClient::get_secret`], which probes every
//!   response shape observed in production before giving up
//!
//! Every call is a single attempt. Retry and backoff policy belongs to the
//! caller (the readiness prober and the flag resolution chain in
//! `labrange-core`) so retry semantics stay visible at the call site.
//!
//! # Example
//!
//! ```no_run
//! use labrange_orchestrator::{OrchestratorClient, OrchestratorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OrchestratorClient::new(OrchestratorConfig::from_env()?)?;
//!
//! for workload in client.list_workloads().await? {
//!     println!("{} -> {:?}", workload.id, workload.url);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::OrchestratorClient;
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use types::{DeleteOutcome, WorkloadSpec, WorkloadSummary, extract_secret};
