//! Live backend over an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{BackendError, BackendModeKind, QueryBackend};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const ANSWER_SYSTEM_PROMPT: &str = "You are ChainQuery AI, an expert blockchain data analyst. \
Your role is to help users understand and query blockchain data using natural language.

When a user asks a question about blockchain data, provide:
1. A clear, informative response about what they're asking
2. If applicable, mention what type of blockchain query would be needed
3. Explain the data they would typically see in such queries
4. Be helpful and educational

Keep responses concise but informative. Focus on being helpful for blockchain data analysis.";

const SQL_SYSTEM_PROMPT: &str = "You are a blockchain SQL expert. \
Convert natural language queries about blockchain data into SQL queries.

Available tables:
- blocks (block_number, block_hash, timestamp, gas_used, gas_limit, miner)
- transactions (hash, block_number, from_address, to_address, value, gas_used, gas_price)
- tokens (contract_address, name, symbol, decimals)
- token_transfers (transaction_hash, token_address, from_address, to_address, value)

Return only the SQL query, no explanations.";

/// Generation parameters for one kind of completion.
struct Prompt {
    system: &'static str,
    max_tokens: u32,
    temperature: f32,
    /// Returned when the service answers without any content.
    fallback: &'static str,
    /// Message for failures that are not auth, quota or rate limiting.
    failure: &'static str,
}

const ANSWER_PROMPT: Prompt = Prompt {
    system: ANSWER_SYSTEM_PROMPT,
    max_tokens: 500,
    temperature: 0.7,
    fallback: "No response generated",
    failure: "Failed to process query with AI",
};

const SQL_PROMPT: Prompt = Prompt {
    system: SQL_SYSTEM_PROMPT,
    max_tokens: 300,
    temperature: 0.1,
    fallback: "SELECT 1",
    failure: "Failed to generate SQL query",
};

/// Connection settings for the live service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSettings {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model name sent with every request.
    pub model: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Backend that delegates to a chat completions service.
pub struct LiveBackend {
    api_key: String,
    settings: LiveSettings,
    client: Client,
}

impl LiveBackend {
    /// Create a live backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(api_key: String, settings: LiveSettings) -> Result<Self, BackendError> {
        let client = Client::builder().build().map_err(|e| {
            tracing::error!("failed to build HTTP client: {e}");
            BackendError::Service("Failed to initialize AI client".to_string())
        })?;
        Ok(Self {
            api_key,
            settings,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn complete(&self, prompt: &Prompt, text: &str) -> Result<String, BackendError> {
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("chat completion request failed: {e}");
                BackendError::Service(prompt.failure.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("chat completion API error ({status}): {body}");
            return Err(classify_failure(status, &body, prompt.failure));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("failed to parse chat completion response: {e}");
            BackendError::Service(prompt.failure.to_string())
        })?;

        Ok(first_content(completion).unwrap_or_else(|| prompt.fallback.to_string()))
    }
}

#[async_trait]
impl QueryBackend for LiveBackend {
    fn mode(&self) -> BackendModeKind {
        BackendModeKind::Live
    }

    async fn process_query(&self, text: &str) -> Result<String, BackendError> {
        self.complete(&ANSWER_PROMPT, text).await
    }

    async fn generate_sql(&self, text: &str) -> Result<String, BackendError> {
        self.complete(&SQL_PROMPT, text).await
    }
}

/// Take the first choice's content, treating empty content as absent.
fn first_content(completion: ChatCompletionResponse) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
}

/// Map an unsuccessful HTTP response onto a [`BackendError`].
///
/// Uses the status code and the structured `error.code` / `error.type`
/// fields of the body. Unparseable bodies fall back to the status alone.
fn classify_failure(status: StatusCode, body: &str, failure: &str) -> BackendError {
    let error = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|response| response.error);
    let has_marker = |marker: &str| {
        error.as_ref().is_some_and(|e| {
            e.code.as_deref() == Some(marker) || e.kind.as_deref() == Some(marker)
        })
    };

    if has_marker("insufficient_quota") {
        BackendError::QuotaExceeded
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || has_marker("invalid_api_key")
    {
        BackendError::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited
    } else {
        BackendError::Service(failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode as AxumStatus, routing::post};
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_classify_auth() {
        assert_eq!(
            classify_failure(StatusCode::UNAUTHORIZED, "", "x"),
            BackendError::Auth
        );
        assert_eq!(
            classify_failure(StatusCode::FORBIDDEN, "{}", "x"),
            BackendError::Auth
        );
        let body = r#"{"error":{"code":"invalid_api_key","type":"invalid_request_error"}}"#;
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, body, "x"),
            BackendError::Auth
        );
    }

    #[test]
    fn test_classify_quota_before_rate_limit() {
        let body = r#"{"error":{"code":"insufficient_quota","type":"insufficient_quota"}}"#;
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, body, "x"),
            BackendError::QuotaExceeded
        );
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = r#"{"error":{"code":"rate_limit_exceeded","type":"requests"}}"#;
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, body, "x"),
            BackendError::RateLimited
        );
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "not json", "x"),
            BackendError::RateLimited
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "{}", "Failed"),
            BackendError::Service("Failed".to_string())
        );
        // A numeric code from a non-OpenAI provider is ignored, not fatal.
        assert_eq!(
            classify_failure(StatusCode::BAD_GATEWAY, r#"{"error":{"code":502}}"#, "Failed"),
            BackendError::Service("Failed".to_string())
        );
    }

    #[test]
    fn test_first_content_defaults() {
        let empty = ChatCompletionResponse { choices: vec![] };
        assert_eq!(first_content(empty), None);

        let blank = ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: Some(ChatChoiceMessage {
                    content: Some(String::new()),
                }),
            }],
        };
        assert_eq!(first_content(blank), None);
    }

    /// Requests captured by the mock service.
    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Start a mock chat completions service that always answers with
    /// `status` and `body`. Returns its base URL and the captured requests.
    async fn mock_service(status: AxumStatus, body: Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(captured): State<Captured>,
                          headers: axum::http::HeaderMap,
                          Json(request): Json<Value>| {
                        let body = body.clone();
                        async move {
                            let auth = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            captured.lock().unwrap().push((auth, request));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(Arc::clone(&captured));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), captured)
    }

    fn backend(base_url: String) -> LiveBackend {
        LiveBackend::new(
            "sk-test".to_string(),
            LiveSettings {
                base_url,
                model: "test-model".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_process_query_returns_first_choice() {
        let (url, captured) = mock_service(
            AxumStatus::OK,
            json!({"choices": [
                {"message": {"role": "assistant", "content": "Blocks are batches."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]}),
        )
        .await;

        let answer = backend(url).process_query("What is a block?").await;
        assert_eq!(answer, Ok("Blocks are batches.".to_string()));

        let captured = captured.lock().unwrap();
        let (auth, request) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(request["model"], "test-model");
        assert_eq!(request["max_tokens"], 500);
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1]["role"], "user");
        assert_eq!(request["messages"][1]["content"], "What is a block?");
    }

    #[tokio::test]
    async fn test_generate_sql_uses_schema_prompt() {
        let (url, captured) = mock_service(
            AxumStatus::OK,
            json!({"choices": [{"message": {"content": "SELECT * FROM blocks LIMIT 10"}}]}),
        )
        .await;

        let sql = backend(url).generate_sql("latest 10 blocks").await;
        assert_eq!(sql, Ok("SELECT * FROM blocks LIMIT 10".to_string()));

        let captured = captured.lock().unwrap();
        let (_, request) = &captured[0];
        assert_eq!(request["max_tokens"], 300);
        let system = request["messages"][0]["content"].as_str().unwrap_or_default();
        assert!(system.contains("token_transfers"));
        assert!(system.contains("Return only the SQL query"));
    }

    #[tokio::test]
    async fn test_missing_choices_use_fallbacks() {
        let (url, _) = mock_service(AxumStatus::OK, json!({"choices": []})).await;
        let live = backend(url);
        assert_eq!(
            live.process_query("hi").await,
            Ok("No response generated".to_string())
        );
        assert_eq!(live.generate_sql("hi").await, Ok("SELECT 1".to_string()));
    }

    #[tokio::test]
    async fn test_http_failures_are_classified() {
        let (url, _) = mock_service(
            AxumStatus::UNAUTHORIZED,
            json!({"error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}}),
        )
        .await;
        assert_eq!(backend(url).process_query("q").await, Err(BackendError::Auth));

        let (url, _) = mock_service(
            AxumStatus::TOO_MANY_REQUESTS,
            json!({"error": {"type": "insufficient_quota", "code": "insufficient_quota"}}),
        )
        .await;
        assert_eq!(
            backend(url).process_query("q").await,
            Err(BackendError::QuotaExceeded)
        );

        let (url, _) = mock_service(AxumStatus::TOO_MANY_REQUESTS, json!({})).await;
        assert_eq!(
            backend(url).process_query("q").await,
            Err(BackendError::RateLimited)
        );

        let (url, _) = mock_service(AxumStatus::INTERNAL_SERVER_ERROR, json!({})).await;
        let live = backend(url);
        assert_eq!(
            live.process_query("q").await,
            Err(BackendError::Service(
                "Failed to process query with AI".to_string()
            ))
        );
        assert_eq!(
            live.generate_sql("q").await,
            Err(BackendError::Service("Failed to generate SQL query".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_service_error() {
        // Bind and drop a listener so the port is very likely closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = backend(format!("http://{addr}/v1")).process_query("q").await;
        assert_eq!(
            result,
            Err(BackendError::Service(
                "Failed to process query with AI".to_string()
            ))
        );
    }
}
