//! Test that backend failures become error envelopes with 500/503.

use std::sync::Arc;

use serde_json::json;

use crate::backend::BackendError;
use crate::config::Environment;
use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_auth_failure_is_service_unavailable() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::Auth)),
        Environment::Production,
    )
    .await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "What is gas?"}))
        .await;

    assert_eq!(status, 503);
    assert_envelope(&body);
    assert_eq!(result_of(&body), "Error: Invalid or missing OpenAI API key");
}

#[tokio::test]
async fn test_quota_failure_is_internal_error() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::QuotaExceeded)),
        Environment::Production,
    )
    .await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "What is gas?"}))
        .await;

    assert_eq!(status, 500);
    assert_eq!(result_of(&body), "Error: OpenAI API quota exceeded");
}

#[tokio::test]
async fn test_rate_limit_failure_is_internal_error() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::RateLimited)),
        Environment::Production,
    )
    .await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "What is gas?"}))
        .await;

    assert_eq!(status, 500);
    assert!(result_of(&body).contains("rate limit exceeded"));
}

#[tokio::test]
async fn test_generic_failure_is_internal_error() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::Service(
            "Failed to process query with AI".to_string(),
        ))),
        Environment::Production,
    )
    .await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "What is gas?"}))
        .await;

    assert_eq!(status, 500);
    assert_envelope(&body);
    assert_eq!(result_of(&body), "Error: Failed to process query with AI");
}

#[tokio::test]
async fn test_validation_runs_before_backend() {
    let server = TestServer::start(
        Arc::new(FailingBackend(BackendError::Auth)),
        Environment::Production,
    )
    .await;

    let (status, body) = server.post_json("/api/query", &json!({})).await;

    assert_eq!(status, 400);
    assert!(result_of(&body).contains("Query is required"));
}
