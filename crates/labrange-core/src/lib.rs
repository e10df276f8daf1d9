// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Labrange Core - Instance Reconciliation and Lifecycle Control
//!
//! This crate is the control plane for ephemeral, per-user challenge
//! instances on the labrange training platform. Two independent systems know
//! about an instance and drift apart: the live **orchestrator** (authoritative
//! for runtime status and network address, no durable history) and the
//! durable **registry** (authoritative for ownership and existence, blind to
//! live status). This crate merges the two into one coherent view and drives
//! instances through their lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  Auth front end / learner UI                     │
//! │          (injects verified principal headers, polls view)        │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     labrange-core (This Crate)                   │
//! │  ┌────────────┐ ┌───────────┐ ┌────────────┐ ┌───────────────┐  │
//! │  │   Status   │ │ Readiness │ │    Flag    │ │  Termination  │  │
//! │  │ Reconciler │ │  Prober   │ │ Resolution │ │   Workflow    │  │
//! │  └────────────┘ └───────────┘ └────────────┘ └───────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//!            │                                        │
//!            │ labrange-orchestrator (HTTP,           │ sqlx
//!            ▼ self-signed TLS tolerated)             ▼
//! ┌─────────────────────────┐            ┌─────────────────────────┐
//! │      Orchestrator       │            │       PostgreSQL        │
//! │  (schedules workloads,  │            │  (instance registry,    │
//! │   holds flag secrets)   │            │   fallback flags)       │
//! └─────────────────────────┘            └─────────────────────────┘
//! ```
//!
//! # Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `GET /api/instances` | Merged orchestrator+registry view for the principal |
//! | `POST /api/instances/terminate` | Idempotent termination (registry delete, best-effort teardown) |
//! | `GET /api/instances/probe` | Bounded readiness probe of an instance URL |
//! | `POST /api/instances/flag` | Flag resolution with registry fallback |
//! | `GET /health` | Liveness and database connectivity |
//!
//! # Instance Status State Machine
//!
//! ```text
//!   ┌────────┐    ┌──────────┐    ┌────────┐    ┌─────────────┐    ┌────────────┐
//!   │ QUEUED │───►│ CREATING │───►│ ACTIVE │───►│ TERMINATING │───►│ TERMINATED │
//!   └────┬───┘    └────┬─────┘    └───┬────┘    └──────┬──────┘    └────────────┘
//!        │             │              │                │
//!        └─────────────┴──────┬───────┴────────────────┘
//!                             ▼
//!                         ┌───────┐
//!                         │ ERROR │
//!                         └───────┘
//! ```
//!
//! Transitions are monotonic except into `ERROR`, reachable from any
//! non-terminal state. A `TERMINATED` record is never resurrected.
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LABRANGE_DATABASE_URL` | Yes* | - | PostgreSQL connection string |
//! | `DATABASE_URL` | Yes* | - | Fallback if above not set |
//! | `LABRANGE_HTTP_PORT` | No | `8088` | HTTP API port |
//! | `LABRANGE_ORCHESTRATOR_URL` | Yes | - | Orchestrator base URL |
//! | `LABRANGE_ORCHESTRATOR_TOKEN` | No | unset | Bearer token |
//! | `LABRANGE_ORCHESTRATOR_SKIP_CERT_VERIFICATION` | No | `false` | Accept self-signed certs |
//! | `LABRANGE_PROBE_MAX_ATTEMPTS` | No | `10` | Readiness probe attempt cap |
//! | `LABRANGE_PROBE_TIMEOUT_MS` | No | `2000` | Per-attempt probe timeout |
//!
//! # Modules
//!
//! - [`config`]: Server configuration from environment variables
//! - [`db`]: PostgreSQL registry store for instance records
//! - [`error`]: Error taxonomy with stable kinds for API payloads
//! - [`flags`]: Flag resolution chain (orchestrator, then registry)
//! - [`handlers`]: API request handlers
//! - [`probe`]: Bounded readiness probing with progressive backoff
//! - [`reconcile`]: Dual-source merge into the authoritative view
//! - [`server`]: axum HTTP server

#![deny(missing_docs)]

/// Server configuration loaded from environment variables.
pub mod config;

/// PostgreSQL registry store for instance records.
pub mod db;

/// Error taxonomy for core operations.
pub mod error;

/// Flag resolution chain with registry fallback.
pub mod flags;

/// API request handlers.
pub mod handlers;

/// Readiness probing with bounded attempts and progressive backoff.
pub mod probe;

/// Status reconciliation across orchestrator and registry.
pub mod reconcile;

/// HTTP API server.
pub mod server;

pub use config::Config;
pub use error::Error;
