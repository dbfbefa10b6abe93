//! Query execution pipeline.
//!
//! Runs a raw query value through validation, sanitization and the configured
//! backend, and shapes the outcome into a [`ResultEnvelope`].
//!
//! # Post-conditions
//!
//! - `execute` always returns an envelope. Validation and backend failures
//!   are reported inside it, never raised.
//! - Every envelope carries the elapsed time since `execute` was entered and
//!   an ISO-8601 timestamp.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::backend::{BackendErrorKind, QueryBackend};
use crate::clock::{SystemTimeSource, TimeSource};
use crate::envelope::{ERROR_PREFIX, ResultEnvelope};
use crate::query::Query;
use crate::validation::{ValidationError, sanitize_query, validate_query};

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The backend produced an answer.
    Success,
    /// The caller supplied an unacceptable query.
    InvalidInput(ValidationError),
    /// The backend failed.
    BackendFailure(BackendErrorKind),
}

impl ExecutionOutcome {
    /// HTTP status code for this outcome.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::InvalidInput(_) => 400,
            Self::BackendFailure(kind) if kind.is_unavailable() => 503,
            Self::BackendFailure(_) => 500,
        }
    }
}

/// Envelope plus the outcome that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub outcome: ExecutionOutcome,
    pub envelope: ResultEnvelope,
}

/// Orchestrates validation, sanitization and backend dispatch.
///
/// Holds only shared, read-only collaborators, so one executor serves every
/// concurrent request.
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn QueryBackend>,
    clock: Arc<dyn TimeSource>,
}

impl QueryExecutor {
    /// Create an executor over `backend`, stamping envelopes with system time.
    #[must_use]
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemTimeSource))
    }

    #[must_use]
    pub fn with_clock(backend: Arc<dyn QueryBackend>, clock: Arc<dyn TimeSource>) -> Self {
        Self { backend, clock }
    }

    #[must_use]
    pub fn backend(&self) -> &dyn QueryBackend {
        self.backend.as_ref()
    }

    /// Execute a raw query value taken from a request body.
    ///
    /// `raw` is `None` when the body had no `query` field.
    pub async fn execute(&self, raw: Option<&Value>) -> Execution {
        let started = Instant::now();

        let text = match raw {
            Some(Value::String(text)) => text.as_str(),
            _ => "",
        };
        if let Err(error) = validate_query(raw).into_result() {
            tracing::debug!("rejected query: {error}");
            return self.finish(
                started,
                ExecutionOutcome::InvalidInput(error),
                format!("{ERROR_PREFIX}{error}"),
            );
        }

        let query = Query::new(sanitize_query(text), self.clock.as_ref());
        tracing::debug!(
            query_id = %query.id,
            mode = %self.backend.mode(),
            "dispatching query"
        );

        match self.backend.process_query(&query.text).await {
            Ok(result) => self.finish(started, ExecutionOutcome::Success, result),
            Err(error) => {
                tracing::error!(query_id = %query.id, "query processing error: {error}");
                self.finish(
                    started,
                    ExecutionOutcome::BackendFailure(error.kind()),
                    format!("{ERROR_PREFIX}{error}"),
                )
            }
        }
    }

    /// Stamp the result with elapsed time and the current timestamp.
    fn finish(&self, started: Instant, outcome: ExecutionOutcome, result: String) -> Execution {
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Execution {
            outcome,
            envelope: ResultEnvelope::new(result, elapsed, self.clock.now_iso()),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::backend::{BackendError, BackendModeKind, OfflineBackend};
    use crate::clock::FixedTimeSource;

    /// Backend that always fails with the given error.
    struct FailingBackend(BackendError);

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

    /// Backend that echoes the text it receives.
    struct EchoBackend;

    #[async_trait]
    impl QueryBackend for EchoBackend {
        fn mode(&self) -> BackendModeKind {
            BackendModeKind::Offline
        }

        async fn process_query(&self, text: &str) -> Result<String, BackendError> {
            Ok(format!("<{text}>"))
        }

        async fn generate_sql(&self, text: &str) -> Result<String, BackendError> {
            Ok(text.to_string())
        }
    }

    fn executor(backend: Arc<dyn QueryBackend>) -> QueryExecutor {
        QueryExecutor::with_clock(
            backend,
            Arc::new(FixedTimeSource::from_millis(1_700_000_000_000)),
        )
    }

    #[tokio::test]
    async fn test_offline_success() {
        let executor = executor(Arc::new(OfflineBackend));
        let query = json!("What is blockchain?");
        let execution = executor.execute(Some(&query)).await;

        assert_eq!(execution.outcome, ExecutionOutcome::Success);
        assert_eq!(execution.outcome.status_code(), 200);
        assert!(execution.envelope.result.contains("Test Mode Response"));
        assert!(execution.envelope.result.contains("What is blockchain?"));
        assert_eq!(execution.envelope.timestamp, "2023-11-14T22:13:20.000Z");
    }

    #[tokio::test]
    async fn test_validation_failures_map_to_400() {
        let executor = executor(Arc::new(OfflineBackend));
        let cases = [
            (None, "Query is required"),
            (Some(json!(null)), "Query is required"),
            (Some(json!("")), "Query cannot be empty"),
            (Some(json!(123)), "Query must be a string"),
            (Some(json!("DROP TABLE blocks")), "Query contains potentially harmful content"),
        ];
        for (raw, message) in cases {
            let execution = executor.execute(raw.as_ref()).await;
            assert_eq!(execution.outcome.status_code(), 400);
            assert_eq!(execution.envelope.result, format!("Error: {message}"));
        }
    }

    #[tokio::test]
    async fn test_backend_receives_sanitized_text() {
        let executor = executor(Arc::new(EchoBackend));
        let query = json!("  latest \n\n  blocks  ");
        let execution = executor.execute(Some(&query)).await;
        assert_eq!(execution.envelope.result, "<latest blocks>");
    }

    #[tokio::test]
    async fn test_auth_failure_maps_to_503() {
        let executor = executor(Arc::new(FailingBackend(BackendError::Auth)));
        let query = json!("What is gas?");
        let execution = executor.execute(Some(&query)).await;

        assert_eq!(
            execution.outcome,
            ExecutionOutcome::BackendFailure(BackendErrorKind::Auth)
        );
        assert_eq!(execution.outcome.status_code(), 503);
        assert_eq!(
            execution.envelope.result,
            "Error: Invalid or missing OpenAI API key"
        );
    }

    #[tokio::test]
    async fn test_other_backend_failures_map_to_500() {
        for error in [
            BackendError::QuotaExceeded,
            BackendError::RateLimited,
            BackendError::Service("Failed to process query with AI".to_string()),
        ] {
            let expected = format!("Error: {error}");
            let executor = executor(Arc::new(FailingBackend(error)));
            let query = json!("What is gas?");
            let execution = executor.execute(Some(&query)).await;
            assert_eq!(execution.outcome.status_code(), 500);
            assert_eq!(execution.envelope.result, expected);
        }
    }

    #[tokio::test]
    async fn test_every_branch_is_timed_and_stamped() {
        let executor = QueryExecutor::new(Arc::new(OfflineBackend));
        let valid = json!("gas prices");
        for raw in [None, Some(&valid)] {
            let envelope = executor.execute(raw).await.envelope;
            assert!(envelope.execution_time < 60_000);
            assert!(chrono::DateTime::parse_from_rfc3339(&envelope.timestamp).is_ok());
        }
    }
}
