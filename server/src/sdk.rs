//! Chain-data SDK.
//!
//! [`ChainQuerySdk`] wraps a [`QueryEngine`] with canned block and
//! transaction queries. The engine does not talk to a chain-data store: it
//! records each submitted query in memory and answers with a simulated
//! acknowledgement after a fixed latency.
//!
//! # Thread Safety
//!
//! The engine keeps submitted queries behind an `RwLock`, so one engine can
//! be shared across tasks.
//!
//! # Invariants
//!
//! - Recorded queries are never removed for the lifetime of the engine.
//! - Timeout, retry and cache options are stored but not enforced.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::query::{Query, QueryId, QueryOptions};

/// Latency applied to each simulated execution.
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_millis(100);

/// Result of a simulated execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub data: Option<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time: u64,
    pub timestamp: String,
}

/// Errors raised inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The query registry lock was poisoned by a panicking writer.
    LockPoisoned,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockPoisoned => write!(f, "query registry lock poisoned"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Simulated query engine that remembers what it was asked.
pub struct QueryEngine {
    options: QueryOptions,
    queries: RwLock<HashMap<QueryId, Query>>,
    latency: Duration,
    clock: Arc<dyn TimeSource>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(options: QueryOptions) -> Self {
        Self::with_latency(options, DEFAULT_SIMULATED_LATENCY)
    }

    #[must_use]
    pub fn with_latency(options: QueryOptions, latency: Duration) -> Self {
        Self {
            options,
            queries: RwLock::new(HashMap::new()),
            latency,
            clock: Arc::new(SystemTimeSource),
        }
    }

    #[must_use]
    pub const fn options(&self) -> QueryOptions {
        self.options
    }

    /// Record `query` and return a simulated result.
    pub async fn execute_query(&self, query: Query) -> QueryResult {
        let started = Instant::now();
        let id = query.id.clone();

        let outcome = self.record(query);
        if outcome.is_ok() {
            tokio::time::sleep(self.latency).await;
        }

        let execution_time = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let timestamp = self.clock.now_iso();
        match outcome {
            Ok(()) => {
                tracing::debug!(query_id = %id, execution_time, "executed simulated query");
                QueryResult {
                    data: Some(json!({ "message": format!("Query {id} executed successfully") })),
                    success: true,
                    error: None,
                    execution_time,
                    timestamp,
                }
            }
            Err(e) => {
                tracing::error!(query_id = %id, "failed to execute query: {e}");
                QueryResult {
                    data: None,
                    success: false,
                    error: Some(e.to_string()),
                    execution_time,
                    timestamp,
                }
            }
        }
    }

    fn record(&self, query: Query) -> Result<(), EngineError> {
        let mut queries = self
            .queries
            .write()
            .map_err(|_| EngineError::LockPoisoned)?;
        queries.insert(query.id.clone(), query);
        Ok(())
    }

    /// Look up a previously executed query.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn get_query(&self, id: &QueryId) -> Result<Option<Query>, EngineError> {
        let queries = self.queries.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(queries.get(id).cloned())
    }

    /// All executed queries, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn all_queries(&self) -> Result<Vec<Query>, EngineError> {
        let queries = self.queries.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(queries.values().cloned().collect())
    }
}

/// SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::client::DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            retries: 3,
        }
    }
}

/// Partial update applied by [`ChainQuerySdk::update_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkConfigUpdate {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

/// Entry point for chain-data queries.
pub struct ChainQuerySdk {
    config: SdkConfig,
    engine: QueryEngine,
    clock: Arc<dyn TimeSource>,
}

impl ChainQuerySdk {
    /// Create an SDK whose engine inherits the timeout and retry settings.
    #[must_use]
    pub fn new(config: SdkConfig) -> Self {
        let engine = QueryEngine::new(Self::engine_options(&config));
        Self::with_engine(config, engine)
    }

    #[must_use]
    pub fn with_engine(config: SdkConfig, engine: QueryEngine) -> Self {
        Self {
            config,
            engine,
            clock: Arc::new(SystemTimeSource),
        }
    }

    /// Engine options derived from an SDK configuration.
    #[must_use]
    pub const fn engine_options(config: &SdkConfig) -> QueryOptions {
        QueryOptions {
            timeout_ms: Some(config.timeout_ms),
            retries: Some(config.retries),
            cache_enabled: Some(true),
        }
    }

    #[must_use]
    pub const fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Run an arbitrary query with optional named parameters.
    ///
    /// The query carries the current timeout and retry settings.
    pub async fn query_chain_data(
        &self,
        text: &str,
        parameters: Option<Map<String, Value>>,
    ) -> QueryResult {
        let mut query = Query::new(text, self.clock.as_ref());
        query.parameters = parameters;
        query.options = Some(QueryOptions {
            timeout_ms: Some(self.config.timeout_ms),
            retries: Some(self.config.retries),
            cache_enabled: None,
        });
        self.engine.execute_query(query).await
    }

    pub async fn get_block_data(&self, block_number: u64) -> QueryResult {
        self.query_chain_data(
            "SELECT * FROM blocks WHERE block_number = ?",
            Some(params([("blockNumber", json!(block_number))])),
        )
        .await
    }

    pub async fn get_transactions_by_address(&self, address: &str) -> QueryResult {
        self.query_chain_data(
            "SELECT * FROM transactions WHERE from_address = ? OR to_address = ?",
            Some(params([
                ("address1", json!(address)),
                ("address2", json!(address)),
            ])),
        )
        .await
    }

    /// Most recent blocks, newest first. Callers without a preference pass 10.
    pub async fn get_latest_blocks(&self, limit: u32) -> QueryResult {
        self.query_chain_data(
            "SELECT * FROM blocks ORDER BY block_number DESC LIMIT ?",
            Some(params([("limit", json!(limit))])),
        )
        .await
    }

    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Merge `update` into the configuration.
    ///
    /// The engine keeps the options it was created with.
    pub fn update_config(&mut self, update: SdkConfigUpdate) {
        if let Some(api_key) = update.api_key {
            self.config.api_key = Some(api_key);
        }
        if let Some(base_url) = update.base_url {
            self.config.base_url = base_url;
        }
        if let Some(timeout_ms) = update.timeout_ms {
            self.config.timeout_ms = timeout_ms;
        }
        if let Some(retries) = update.retries {
            self.config.retries = retries;
        }
    }
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
