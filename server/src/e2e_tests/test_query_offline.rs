//! Test that valid queries are answered by the offline backend.

use serde_json::json;

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_valid_query_in_test_mode() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "What is blockchain?"}))
        .await;

    assert_eq!(status, 200);
    assert_envelope(&body);
    assert!(result_of(&body).contains("Test Mode Response"));
    assert!(result_of(&body).contains("What is blockchain?"));
}

#[tokio::test]
async fn test_moderately_long_query() {
    let server = TestServer::offline().await;
    let long_query = "What is blockchain? ".repeat(10);

    let (status, body) = server
        .post_json("/api/query", &json!({"query": long_query}))
        .await;

    assert_eq!(status, 200);
    assert!(result_of(&body).contains("Test Mode Response"));
}

#[tokio::test]
async fn test_query_is_sanitized_before_dispatch() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "  show   me\n\tthe latest blocks  "}))
        .await;

    assert_eq!(status, 200);
    assert!(result_of(&body).contains("\"show me the latest blocks\""));
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let server = TestServer::offline().await;

    let (status, body) = server
        .post_json("/api/query", &json!({"query": "gas prices", "limit": 5}))
        .await;

    assert_eq!(status, 200);
    assert!(result_of(&body).contains("gas prices"));
}
