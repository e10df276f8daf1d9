// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Readiness prober tests against a mock HTTP server.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use labrange_core::probe::{ProbeOutcome, probe_client, probe_url};

fn http() -> reqwest::Client {
    probe_client(Duration::from_secs(2)).expect("Failed to build probe client")
}

#[tokio::test]
async fn test_ready_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = probe_url(&http(), &server.uri(), 5).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Ready {
            status: 200,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn test_always_unavailable_makes_exactly_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let outcome = probe_url(&http(), &server.uri(), 5).await;

    assert_eq!(outcome, ProbeOutcome::Failed { attempts: 5 });
    // Mock expectation verifies exactly 5 requests were made.
}

#[tokio::test]
async fn test_ready_on_third_attempt_after_404s() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = probe_url(&http(), &server.uri(), 10).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Ready {
            status: 200,
            attempts: 3
        }
    );
}

#[tokio::test]
async fn test_gateway_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let outcome = probe_url(&http(), &server.uri(), 3).await;

    assert!(outcome.is_ready());
    assert_eq!(outcome.attempts(), 2);
}

#[tokio::test]
async fn test_non_retry_status_counts_as_ready() {
    // A 401 means something answered; the instance is reachable even if it
    // wants credentials.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let outcome = probe_url(&http(), &server.uri(), 3).await;

    assert_eq!(
        outcome,
        ProbeOutcome::Ready {
            status: 401,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn test_connection_refused_is_retried_until_exhausted() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = probe_url(&http(), &format!("http://{addr}/"), 2).await;

    assert_eq!(outcome, ProbeOutcome::Failed { attempts: 2 });
}
