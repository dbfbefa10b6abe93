//! Test that unparseable bodies produce a generic 500.

use std::sync::Arc;

use crate::backend::OfflineBackend;
use crate::config::Environment;
use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_malformed_json_is_redacted_in_production() {
    let server = TestServer::start(Arc::new(OfflineBackend), Environment::Production).await;

    let (status, body) = server
        .post_raw("/api/query", "{\"query\": ", "application/json")
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal Server Error");
    assert_eq!(body["message"], "Something went wrong!");
}

#[tokio::test]
async fn test_malformed_json_has_detail_in_development() {
    let server = TestServer::start(Arc::new(OfflineBackend), Environment::Development).await;

    let (status, body) = server
        .post_raw("/api/query", "{\"query\": ", "application/json")
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Internal Server Error");
    let message = body["message"].as_str().unwrap_or_default();
    assert!(!message.is_empty());
    assert_ne!(message, "Something went wrong!");
}
