//! Test that a panic while handling a request becomes a 500.

use std::sync::Arc;

use serde_json::json;

use crate::config::Environment;
use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_panic_is_redacted_in_production() {
    let server = TestServer::start(Arc::new(PanickingBackend), Environment::Production).await;

    let (status, body) = server.post_json("/api/query", &json!({"query": "hi"})).await;

    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({"error": "Internal Server Error", "message": "Something went wrong!"})
    );
}

#[tokio::test]
async fn test_panic_has_detail_in_development() {
    let server = TestServer::start(Arc::new(PanickingBackend), Environment::Development).await;

    let (status, body) = server.post_json("/api/query", &json!({"query": "hi"})).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal Server Error");
    assert_eq!(body["message"], "backend exploded on \"hi\"");
}

#[tokio::test]
async fn test_server_keeps_serving_after_panic() {
    let server = TestServer::start(Arc::new(PanickingBackend), Environment::Production).await;

    let (status, _) = server.post_json("/api/query", &json!({"query": "hi"})).await;
    assert_eq!(status, 500);

    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    // Validation still runs before the backend is reached.
    let (status, body) = server.post_json("/api/query", &json!({})).await;
    assert_eq!(status, 400);
    assert!(result_of(&body).contains("Query is required"));
}
