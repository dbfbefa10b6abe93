#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics on bad input.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;

use chainquery_server::{
    QueryExecutor, backend,
    config::ServerConfig,
    http::{self, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainquery_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen_port={}, environment={}, backend={}",
        config.listen_port,
        config.environment.as_str(),
        config.backend_mode.kind()
    );

    // The backend mode is fixed here for the lifetime of the process.
    let backend = match backend::build(config.backend_mode.clone(), config.live.clone()) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("Failed to create query backend: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(QueryExecutor::new(backend), config.environment);
    let app = http::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);
    tracing::info!("query endpoint: http://localhost:{}/api/query", config.listen_port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
