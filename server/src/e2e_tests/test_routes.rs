//! Test the informational routes and the 404 fallback.

use crate::e2e_tests::helpers::*;

#[tokio::test]
async fn test_query_documentation() {
    let server = TestServer::offline().await;

    let (status, body) = server.get("/api/query").await;

    assert_eq!(status, 200);
    assert_eq!(body["method"], "POST");
    assert_eq!(body["endpoint"], "/api/query");
    assert_eq!(body["example"]["query"], "Show me the latest 10 blocks");
}

#[tokio::test]
async fn test_service_info() {
    let server = TestServer::offline().await;

    let (status, body) = server.get("/").await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "ChainQuery AI Backend API");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["endpoints"]["api"], "/api/query");
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::offline().await;

    let (status, body) = server.get("/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");
    assert!(body["uptime"].as_f64().is_some_and(|u| u >= 0.0));
}

#[tokio::test]
async fn test_legacy_status() {
    let server = TestServer::offline().await;

    let (status, body) = server.get("/api/v1/status").await;

    assert_eq!(status, 200);
    assert_eq!(body["version"], "v1");
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::offline().await;

    let (status, body) = server.get("/api/unknown?x=1").await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["path"], "/api/unknown?x=1");
    let endpoints = body["availableEndpoints"].as_array().cloned().unwrap_or_default();
    assert!(endpoints.iter().any(|e| e == "POST /api/query"));
}
