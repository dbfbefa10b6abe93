//! Common helpers for end-to-end tests.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::backend::{BackendError, BackendModeKind, OfflineBackend, QueryBackend};
use crate::config::Environment;
use crate::executor::QueryExecutor;
use crate::http::{AppState, router};

/// A running server that is shut down on drop.
pub struct TestServer {
    pub base_url: String,
    http: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server backed by the offline backend in development mode.
    pub async fn offline() -> Self {
        Self::start(Arc::new(OfflineBackend), Environment::Development).await
    }

    /// Start a server over `backend`.
    pub async fn start(backend: Arc<dyn QueryBackend>, environment: Environment) -> Self {
        let state = AppState::new(QueryExecutor::new(backend), environment);
        let app = router(state);

        #[allow(clippy::expect_used)]
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        #[allow(clippy::expect_used)]
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            http: reqwest::Client::new(),
            handle,
        }
    }

    /// POST a JSON body and return the status and parsed JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        #[allow(clippy::expect_used)]
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        Self::into_parts(response).await
    }

    /// POST a raw body with the given content type.
    pub async fn post_raw(&self, path: &str, body: &str, content_type: &str) -> (StatusCode, Value) {
        #[allow(clippy::expect_used)]
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("content-type", content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("Request failed");
        Self::into_parts(response).await
    }

    /// GET a path and return the status and parsed JSON response.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        #[allow(clippy::expect_used)]
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("Request failed");
        Self::into_parts(response).await
    }

    async fn into_parts(response: reqwest::Response) -> (StatusCode, Value) {
        let status = response.status();
        #[allow(clippy::expect_used)]
        let body = response.json().await.expect("Response should be JSON");
        (status, body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Backend that always fails with the given error.
pub struct FailingBackend(pub BackendError);

#[async_trait]
impl QueryBackend for FailingBackend {
    fn mode(&self) -> BackendModeKind {
        BackendModeKind::Live
    }

    async fn process_query(&self, _text: &str) -> Result<String, BackendError> {
        Err(self.0.clone())
    }

    async fn generate_sql(&self, _text: &str) -> Result<String, BackendError> {
        Err(self.0.clone())
    }
}

/// Assert that a response body is a well-formed result envelope.
pub fn assert_envelope(body: &Value) {
    assert!(body["result"].is_string(), "missing result: {body}");
    assert!(body["executionTime"].is_u64(), "bad executionTime: {body}");
    let timestamp = body["timestamp"].as_str().unwrap_or_default();
    assert!(
        chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(),
        "bad timestamp: {body}"
    );
}

/// The `result` string of an envelope.
pub fn result_of(body: &Value) -> &str {
    body["result"].as_str().unwrap_or_default()
}

/// Backend that panics on every call.
pub struct PanickingBackend;

#[async_trait]
impl QueryBackend for PanickingBackend {
    fn mode(&self) -> BackendModeKind {
        BackendModeKind::Live
    }

    async fn process_query(&self, text: &str) -> Result<String, BackendError> {
        panic!("backend exploded on {text:?}");
    }

    async fn generate_sql(&self, text: &str) -> Result<String, BackendError> {
        panic!("backend exploded on {text:?}");
    }
}
