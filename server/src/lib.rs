// Life of a request:
// 1. JSON body comes in on POST /api/query
// 2. Validate the raw `query` value; reject with 400 on failure
// 3. Sanitize the text and dispatch it to the configured backend
//     - Offline: templated, simulated answer
//     - Live: chat completion call
// 4. Wrap the answer (or error) in an envelope with timing and timestamp
//
// System components:
//  - Validator / sanitizer
//  - Query backends (offline, live)
//  - Query executor
//  - HTTP transport and client wrapper
//  - Simulated chain-data SDK

pub mod backend;
pub mod client;
pub mod clock;
pub mod config;
mod e2e_tests;
pub mod envelope;
pub mod executor;
pub mod http;
pub mod query;
pub mod sdk;
pub mod validation;

pub use backend::{BackendError, BackendMode, QueryBackend};
pub use client::ApiClient;
pub use envelope::{ClientEnvelope, ResultEnvelope};
pub use executor::{Execution, ExecutionOutcome, QueryExecutor};
