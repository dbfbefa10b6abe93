//! HTTP transport.
//!
//! Routes:
//!
//! - `POST /api/query`: run a query through the [`QueryExecutor`]
//! - `GET /api/query`: endpoint documentation
//! - `GET /`: service information
//! - `GET /health`: liveness, uptime and environment
//! - `GET /api/v1/status`: legacy status probe
//!
//! Anything else gets a JSON 404 listing the available endpoints. A panic in
//! any handler becomes a 500 whose detail is only exposed in development.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{OriginalUri, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::FutureExt;
use serde_json::{Value, json};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::config::Environment;
use crate::executor::QueryExecutor;

/// Version reported by the informational endpoints.
pub const API_VERSION: &str = "1.0.0";

const AVAILABLE_ENDPOINTS: [&str; 4] = [
    "GET /",
    "GET /health",
    "GET /api/query",
    "POST /api/query",
];

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    executor: QueryExecutor,
    environment: Environment,
    started: Instant,
    clock: Arc<dyn TimeSource>,
}

impl AppState {
    #[must_use]
    pub fn new(executor: QueryExecutor, environment: Environment) -> Self {
        Self {
            executor,
            environment,
            started: Instant::now(),
            clock: Arc::new(SystemTimeSource),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/v1/status", get(legacy_status))
        .route("/api/query", get(query_docs).post(post_query))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), catch_panics))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn post_query(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        // No JSON content type means no parsed body, so no query.
        Err(JsonRejection::MissingJsonContentType(_)) => Value::Null,
        Err(rejection) => {
            tracing::error!("error in POST /api/query: {}", rejection.body_text());
            return internal_error(state.environment, &rejection.body_text());
        }
    };

    let execution = state.executor.execute(body.get("query")).await;
    let status = StatusCode::from_u16(execution.outcome.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(execution.envelope)).into_response()
}

async fn query_docs() -> Json<Value> {
    Json(json!({
        "message": "ChainQuery API - Natural Language Blockchain Query Processor",
        "method": "POST",
        "endpoint": "/api/query",
        "body": {
            "query": "string (required) - Natural language query about blockchain data"
        },
        "example": {
            "query": "Show me the latest 10 blocks"
        },
        "response": {
            "result": "string - AI processed response",
            "executionTime": "number - Processing time in milliseconds",
            "timestamp": "string - ISO timestamp"
        }
    }))
}

async fn service_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "ChainQuery AI Backend API",
        "version": API_VERSION,
        "timestamp": state.clock.now_iso(),
        "endpoints": {
            "health": "/health",
            "api": "/api/query"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime": state.started.elapsed().as_secs_f64(),
        "timestamp": state.clock.now_iso(),
        "environment": state.environment.as_str(),
    }))
}

async fn legacy_status() -> Json<Value> {
    Json(json!({
        "api": "ChainQuery AI API",
        "version": "v1",
        "status": "active"
    }))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.to_string(),
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        })),
    )
        .into_response()
}

/// Generic 500 response. Details are only exposed in development.
fn internal_error(environment: Environment, detail: &str) -> Response {
    let message = if environment.exposes_error_details() {
        detail
    } else {
        "Something went wrong!"
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "message": message,
        })),
    )
        .into_response()
}

/// Turn a panic anywhere below this layer into a generic 500.
async fn catch_panics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            tracing::error!("panic while handling {method} {uri}: {detail}");
            internal_error(state.environment, detail)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Log each request on arrival and its status and duration on completion.
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();
    tracing::info!("{method} {uri}");

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        tracing::error!("{method} {uri} - {} - {elapsed_ms}ms", status.as_u16());
    } else if status.is_client_error() {
        tracing::warn!("{method} {uri} - {} - {elapsed_ms}ms", status.as_u16());
    } else {
        tracing::info!("{method} {uri} - {} - {elapsed_ms}ms", status.as_u16());
    }
    response
}
