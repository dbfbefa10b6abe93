//! Response envelopes.
//!
//! - [`ResultEnvelope`] is what the server returns from `POST /api/query`.
//! - [`ClientEnvelope`] is the uniform shape the client wrapper hands to
//!   callers, whatever happened on the wire.
//!
//! # Invariants
//!
//! - `ClientEnvelope::success` is `true` exactly when `data` is populated and
//!   `error` is not.

use serde::{Deserialize, Serialize};

/// Prefix applied to every error message placed in a `result` field.
pub const ERROR_PREFIX: &str = "Error: ";

/// Server-side result of a query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub result: String,
    /// Elapsed milliseconds from receipt to envelope construction.
    pub execution_time: u64,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

impl ResultEnvelope {
    #[must_use]
    pub const fn new(result: String, execution_time: u64, timestamp: String) -> Self {
        Self {
            result,
            execution_time,
            timestamp,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.result.starts_with(ERROR_PREFIX)
    }
}

/// Uniform envelope returned by the client wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> ClientEnvelope<T> {
    #[must_use]
    pub fn ok(data: T, execution_time: Option<u64>, timestamp: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time,
            timestamp: Some(timestamp),
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>, timestamp: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time: None,
            timestamp: Some(timestamp),
        }
    }
}
