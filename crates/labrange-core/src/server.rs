// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API server for the instance lifecycle operations.
//!
//! Authentication is out of scope: the auth front end verifies the session
//! and injects `x-labrange-user` / `x-labrange-role` headers on the internal
//! hop. This server trusts those headers as an already-verified principal.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::handlers::{
    self, FlagRequest, HandlerState, Principal, Role, TerminateRequest,
};

/// Header carrying the authenticated principal id.
pub const USER_HEADER: &str = "x-labrange-user";
/// Header carrying the authenticated principal role.
pub const ROLE_HEADER: &str = "x-labrange-role";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            "not_found" => StatusCode::NOT_FOUND,
            "forbidden" => StatusCode::FORBIDDEN,
            "unreachable" => StatusCode::SERVICE_UNAVAILABLE,
            "bad_upstream" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Raw internal messages stay in the logs, not on the wire.
        let message = if kind == "internal" {
            tracing::error!(error = %self, "Internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "kind": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Extract the trusted principal from request headers.
fn principal_from_headers(headers: &HeaderMap) -> Result<Principal> {
    let id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Forbidden("missing principal".to_string()))?
        .to_string();

    let role = match headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok()) {
        Some("admin") => Role::Admin,
        _ => Role::Student,
    };

    Ok(Principal { id, role })
}

/// Build the API router.
pub fn router(state: Arc<HandlerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/instances", get(merged_view))
        .route("/api/instances/terminate", post(terminate))
        .route("/api/instances/probe", get(probe))
        .route("/api/instances/flag", post(flag))
        .with_state(state)
}

/// Run the HTTP server until the listener fails.
pub async fn run_http_server(addr: SocketAddr, state: Arc<HandlerState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Other(e.to_string()))
}

async fn health(State(state): State<Arc<HandlerState>>) -> Result<impl IntoResponse> {
    let response = handlers::handle_health_check(&state).await?;
    Ok(Json(response))
}

async fn merged_view(
    State(state): State<Arc<HandlerState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let principal = principal_from_headers(&headers)?;
    let response = handlers::handle_merged_view(&state, &principal).await?;
    Ok(Json(response))
}

async fn terminate(
    State(state): State<Arc<HandlerState>>,
    headers: HeaderMap,
    Json(request): Json<TerminateRequest>,
) -> Result<impl IntoResponse> {
    let principal = principal_from_headers(&headers)?;
    let response = handlers::handle_terminate(&state, &principal, request).await?;
    Ok(Json(response))
}

/// Query parameters for the readiness probe endpoint.
#[derive(Debug, Deserialize)]
struct ProbeParams {
    url: String,
}

async fn probe(
    State(state): State<Arc<HandlerState>>,
    headers: HeaderMap,
    Query(params): Query<ProbeParams>,
) -> Result<impl IntoResponse> {
    principal_from_headers(&headers)?;
    let response = handlers::handle_probe(&state, &params.url).await?;
    Ok(Json(response))
}

async fn flag(
    State(state): State<Arc<HandlerState>>,
    headers: HeaderMap,
    Json(request): Json<FlagRequest>,
) -> Result<impl IntoResponse> {
    let principal = principal_from_headers(&headers)?;
    let response = handlers::handle_flag(&state, &principal, request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(user: Option<&str>, role: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(user) = user {
            map.insert(USER_HEADER, user.parse().unwrap());
        }
        if let Some(role) = role {
            map.insert(ROLE_HEADER, role.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_principal_from_headers() {
        let principal = principal_from_headers(&headers(Some("user-1"), Some("student"))).unwrap();
        assert_eq!(principal.id, "user-1");
        assert_eq!(principal.role, Role::Student);

        let principal = principal_from_headers(&headers(Some("op-1"), Some("admin"))).unwrap();
        assert_eq!(principal.role, Role::Admin);
    }

    #[test]
    fn test_missing_user_header_is_forbidden() {
        let err = principal_from_headers(&headers(None, Some("admin"))).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn test_unknown_role_defaults_to_student() {
        let principal = principal_from_headers(&headers(Some("user-1"), Some("root"))).unwrap();
        assert_eq!(principal.role, Role::Student);

        let principal = principal_from_headers(&headers(Some("user-1"), None)).unwrap();
        assert_eq!(principal.role, Role::Student);
    }
}
