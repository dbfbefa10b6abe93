//! Test that the client wrapper normalizes every response into an envelope.

use std::sync::Arc;

use crate::backend::BackendError;
use crate::client::ApiClient;
use crate::config::Environment;
use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_success_envelope() {
    let server = TestServer::offline().await;
    let client = ApiClient::new(server.base_url.clone());

    let envelope = client.query("What is blockchain?").await;

    assert!(envelope.success);
    assert!(envelope.error.is_none());
    let data = envelope.data.and_then(|d| d.as_str().map(str::to_string));
    assert!(data.is_some_and(|d| d.contains("Test Mode Response")));
    assert!(envelope.execution_time.is_some());
    assert!(envelope.timestamp.is_some());
}

#[tokio::test]
async fn test_rejected_query_becomes_failure() {
    let server = TestServer::offline().await;
    let client = ApiClient::new(server.base_url.clone());

    let envelope = client.query("").await;

    assert!(!envelope.success);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error.as_deref(), Some("HTTP 400: Bad Request"));
    assert!(envelope.timestamp.is_some());
}

#[tokio::test]
async fn test_backend_outage_becomes_failure() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::Auth)),
        Environment::Production,
    )
    .await;
    let client = ApiClient::new(server.base_url.clone());

    let envelope = client.query("What is gas?").await;

    assert!(!envelope.success);
    assert_eq!(
        envelope.error.as_deref(),
        Some("HTTP 503: Service Unavailable")
    );
}

#[tokio::test]
async fn test_non_json_response_becomes_failure() {
    // Point the client at a route that answers with something other than an envelope.
    let app = axum::Router::new().route(
        "/api/query",
        axum::routing::post(|| async { "plain text" }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let envelope = ApiClient::new(format!("http://{addr}")).query("blocks").await;
    handle.abort();

    assert!(!envelope.success);
    assert!(envelope.error.is_some());
}
