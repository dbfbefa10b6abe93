//! Client for the query endpoint.
//!
//! [`ApiClient::query`] never returns an error: network failures, non-2xx
//! responses and malformed bodies are all folded into a failed
//! [`ClientEnvelope`].

use std::sync::Arc;

use reqwest::Client;
use serde_json::{Value, json};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::envelope::ClientEnvelope;

/// Default server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// HTTP client for `POST /api/query`.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    clock: Arc<dyn TimeSource>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            clock: Arc::new(SystemTimeSource),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit `text` and normalize whatever comes back.
    pub async fn query(&self, text: &str) -> ClientEnvelope<Value> {
        match self.try_query(text).await {
            Ok(envelope) => envelope,
            Err(message) => {
                tracing::debug!("query request failed: {message}");
                ClientEnvelope::failure(message, self.clock.now_iso())
            }
        }
    }

    async fn try_query(&self, text: &str) -> Result<ClientEnvelope<Value>, String> {
        let url = format!("{}/api/query", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": text }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(body
                .get("error")
                .and_then(Value::as_str)
                .map_or_else(
                    || {
                        format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or_default()
                        )
                    },
                    str::to_string,
                ));
        }

        let body: Value = response.json().await.map_err(|e| e.to_string())?;
        let execution_time = body.get("executionTime").and_then(Value::as_u64);
        let timestamp = body
            .get("timestamp")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map_or_else(|| self.clock.now_iso(), str::to_string);
        let data = match body.get("result") {
            Some(result) if is_truthy(result) => result.clone(),
            _ => body,
        };

        Ok(ClientEnvelope::ok(data, execution_time, timestamp))
    }
}

/// Whether a JSON value would be considered present by the server's clients.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
