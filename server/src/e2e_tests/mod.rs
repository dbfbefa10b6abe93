//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario. Every test starts the real
//! router on an ephemeral port and talks to it over HTTP.

#![cfg(test)]

mod helpers;

mod test_backend_failures;
mod test_backend_panic;
mod test_client_wrapper;
mod test_malformed_body;
mod test_query_offline;
mod test_query_validation;
mod test_routes;
