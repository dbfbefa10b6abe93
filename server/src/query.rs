//! Query values submitted for execution.
//!
//! A `Query` is created once per submission, never mutated, and dropped after
//! its result has been produced.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::TimeSource;

/// Alphabet for the random suffix of a query ID.
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix of a query ID.
const ID_SUFFIX_LENGTH: usize = 9;

/// A unique identifier for a query execution.
///
/// # Invariants
///
/// - Generated IDs have the form `query_<unix-ms>_<9 base-36 chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Generate a fresh ID stamped with the current time of `clock`.
    #[must_use]
    pub fn generate(clock: &dyn TimeSource) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..ID_SUFFIX_LENGTH)
            .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
            .collect();
        Self(format!("query_{}_{suffix}", clock.now_ms()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Execution options attached to a query or an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub cache_enabled: Option<bool>,
}

/// A single query submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<QueryOptions>,
}

impl Query {
    /// Create a query with a freshly generated ID.
    #[must_use]
    pub fn new(text: impl Into<String>, clock: &dyn TimeSource) -> Self {
        Self {
            id: QueryId::generate(clock),
            text: text.into(),
            parameters: None,
            options: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedTimeSource;

    #[test]
    fn test_generated_id_shape() {
        let clock = FixedTimeSource::from_millis(1_700_000_000_000);
        let id = QueryId::generate(&clock);
        let rest = id
            .as_str()
            .strip_prefix("query_1700000000000_")
            .unwrap_or_default();
        assert_eq!(rest.len(), ID_SUFFIX_LENGTH);
        assert!(rest.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let clock = FixedTimeSource::from_millis(0);
        let ids: std::collections::HashSet<_> =
            (0..100).map(|_| QueryId::generate(&clock)).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_parameters_omitted_when_absent() {
        let query = Query {
            id: QueryId::from("query_1_abc"),
            text: "latest blocks".to_string(),
            parameters: None,
            options: None,
        };
        let json = serde_json::to_value(&query).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"id": "query_1_abc", "text": "latest blocks"})
        );
    }

    #[test]
    fn test_options_serialize_in_camel_case() {
        let query = Query {
            id: QueryId::from("query_1_abc"),
            text: "latest blocks".to_string(),
            parameters: None,
            options: Some(QueryOptions {
                timeout_ms: Some(30_000),
                retries: Some(3),
                cache_enabled: None,
            }),
        };
        let json = serde_json::to_value(&query).unwrap_or_default();
        assert_eq!(
            json["options"],
            serde_json::json!({"timeoutMs": 30_000, "retries": 3, "cacheEnabled": null})
        );
    }
}
