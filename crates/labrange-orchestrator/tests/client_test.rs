// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Orchestrator client tests against a mock HTTP server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use labrange_orchestrator::{
    DeleteOutcome, OrchestratorClient, OrchestratorConfig, OrchestratorError, WorkloadSpec,
};

fn client_for(server: &MockServer) -> OrchestratorClient {
    OrchestratorClient::new(OrchestratorConfig::new(server.uri()))
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_list_workloads_object_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "workloads": [
                {"id": "abc", "status": "active", "url": "https://abc.example/"},
                {"id": "def", "status": "creating"}
            ]
        })))
        .mount(&server)
        .await;

    let workloads = client_for(&server).list_workloads().await.unwrap();

    assert_eq!(workloads.len(), 2);
    assert_eq!(workloads[0].id, "abc");
    assert_eq!(workloads[0].url.as_deref(), Some("https://abc.example/"));
    assert_eq!(workloads[1].status, "creating");
    assert!(workloads[1].url.is_none());
}

#[tokio::test]
async fn test_list_workloads_bare_array_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workloads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"id": "abc", "status": "active"}])),
        )
        .mount(&server)
        .await;

    let workloads = client_for(&server).list_workloads().await.unwrap();

    assert_eq!(workloads.len(), 1);
    assert_eq!(workloads[0].id, "abc");
}

#[tokio::test]
async fn test_list_workloads_empty_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workloads"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let err = client_for(&server).list_workloads().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::EmptyBody));
}

#[tokio::test]
async fn test_list_workloads_unreachable() {
    // Bind and immediately drop a listener so the port is closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        OrchestratorClient::new(OrchestratorConfig::new(format!("http://{addr}"))).unwrap();
    let err = client.list_workloads().await.unwrap_err();

    assert!(
        matches!(err, OrchestratorError::Unreachable(_)),
        "expected Unreachable, got {err:?}"
    );
}

#[tokio::test]
async fn test_create_workload_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workloads"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "abc"})),
        )
        .mount(&server)
        .await;

    let spec = WorkloadSpec {
        id: "abc".to_string(),
        owner_id: "user-1".to_string(),
        challenge_ref: "sqli-101".to_string(),
        secret_ref: "flag-abc".to_string(),
    };
    let id = client_for(&server).create_workload(&spec).await.unwrap();

    assert_eq!(id, "abc");
}

#[tokio::test]
async fn test_delete_workload_ok_then_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/workloads/abc"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/workloads/abc"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(
        client.delete_workload("abc").await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        client.delete_workload("abc").await.unwrap(),
        DeleteOutcome::NotFound
    );
}

#[tokio::test]
async fn test_delete_workload_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/workloads/abc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_workload("abc").await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Status { code: 500, .. }));
}

#[tokio::test]
async fn test_restart_workload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workloads/abc/restart"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    client_for(&server).restart_workload("abc").await.unwrap();
}

// ============================================================================
// get_secret response shapes
// ============================================================================

async fn secret_server(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/secrets/flag-abc"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_get_secret_top_level_value() {
    let server =
        secret_server(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": "FLAG{top}"
        })))
        .await;

    let value = client_for(&server).get_secret("flag-abc").await.unwrap();
    assert_eq!(value, "FLAG{top}");
}

#[tokio::test]
async fn test_get_secret_nested_value() {
    let server =
        secret_server(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"value": "FLAG{nested}"}
        })))
        .await;

    let value = client_for(&server).get_secret("flag-abc").await.unwrap();
    assert_eq!(value, "FLAG{nested}");
}

#[tokio::test]
async fn test_get_secret_aliases() {
    for (alias, expected) in [("flag", "FLAG{a1}"), ("secret", "FLAG{a2}")] {
        let server = secret_server(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({alias: expected})),
        )
        .await;

        let value = client_for(&server).get_secret("flag-abc").await.unwrap();
        assert_eq!(value, expected);
    }
}

#[tokio::test]
async fn test_get_secret_literal_body() {
    let server = secret_server(ResponseTemplate::new(200).set_body_string("FLAG{literal}")).await;

    let value = client_for(&server).get_secret("flag-abc").await.unwrap();
    assert_eq!(value, "FLAG{literal}");
}

#[tokio::test]
async fn test_get_secret_html_body_is_bad_response() {
    let server =
        secret_server(ResponseTemplate::new(200).set_body_string("<html>gateway</html>")).await;

    let err = client_for(&server).get_secret("flag-abc").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::BadResponse(_)));
}

#[tokio::test]
async fn test_get_secret_empty_body_is_failure() {
    let server = secret_server(ResponseTemplate::new(200).set_body_string("")).await;

    let err = client_for(&server).get_secret("flag-abc").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::EmptyBody));
}

#[tokio::test]
async fn test_get_secret_server_error() {
    let server = secret_server(ResponseTemplate::new(500).set_body_string("oops")).await;

    let err = client_for(&server).get_secret("flag-abc").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Status { code: 500, .. }));
}

#[tokio::test]
async fn test_get_secret_server_error_multibyte_body() {
    // Gateway error pages are often localized; a non-ASCII body longer than
    // the truncation limit must still come back as a Status error.
    let server = secret_server(ResponseTemplate::new(500).set_body_string("€".repeat(100))).await;

    let err = client_for(&server).get_secret("flag-abc").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Status { code: 500, .. }));
}

#[tokio::test]
async fn test_get_secret_unknown_json_shape() {
    let server =
        secret_server(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payload": "FLAG{lost}"
        })))
        .await;

    let err = client_for(&server).get_secret("flag-abc").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::BadResponse(_)));
}
