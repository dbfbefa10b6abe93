//! Test that invalid queries are rejected with 400.

use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_missing_query() {
    let server = TestServer::offline().await;

    let (status, body) = server.post_json("/api/query", &json!({})).await;

    assert_eq!(status, 400);
    assert_envelope(&body);
    assert!(result_of(&body).contains("Query is required"));
}

#[tokio::test]
async fn test_null_query() {
    let server = TestServer::offline().await;

    let (status, body) = server.post_json("/api/query", &json!({"query": null})).await;

    assert_eq!(status, 400);
    assert!(result_of(&body).contains("Query is required"));
}

#[tokio::test]
async fn test_empty_query() {
    let server = TestServer::offline().await;

    let (status, body) = server.post_json("/api/query", &json!({"query": ""})).await;

    assert_eq!(status, 400);
    assert_envelope(&body);
    assert!(result_of(&body).contains("Query cannot be empty"));
}

#[tokio::test]
async fn test_non_string_query() {
    let server = TestServer::offline().await;

    let (status, body) = server.post_json("/api/query", &json!({"query": 123})).await;

    assert_eq!(status, 400);
    assert_envelope(&body);
    assert!(result_of(&body).contains("Query must be a string"));
}

#[tokio::test]
async fn test_too_long_query() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "a".repeat(1001)}))
        .await;

    assert_eq!(status, 400);
    assert_eq!(
        result_of(&body),
        "Error: Query is too long (maximum 1000 characters)"
    );
}

#[tokio::test]
async fn test_harmful_query() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "please DROP TABLE blocks"}))
        .await;

    assert_eq!(status, 400);
    assert_eq!(
        result_of(&body),
        "Error: Query contains potentially harmful content"
    );
}

/// Only JSON bodies are parsed; a form-encoded body carries no query.
#[tokio::test]
async fn test_body_without_json_content_type() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_raw("/api/query", "query=blocks", "application/x-www-form-urlencoded")
        .await;

    assert_eq!(status, 400);
    assert!(result_of(&body).contains("Query is required"));
}
