//! Natural-language query backends.
//!
//! A backend turns a sanitized query into either a free-form answer or a SQL
//! statement. Two implementations exist:
//!
//! - [`OfflineBackend`]: deterministic, templated responses with no I/O. Used
//!   whenever no API credential is configured.
//! - [`LiveBackend`]: forwards the query to an OpenAI-compatible chat
//!   completions service.
//!
//! # Invariants
//!
//! - The variant is chosen exactly once, from a [`BackendMode`], when the
//!   backend is built. A backend never changes mode afterwards.
//! - Backends hold no per-request mutable state and are shared across
//!   concurrent requests behind an `Arc`.

use std::sync::Arc;

use async_trait::async_trait;

mod live;
mod offline;

pub use live::{LiveBackend, LiveSettings};
pub use offline::OfflineBackend;

/// Unified interface over all query backends.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Which mode this backend was built in.
    fn mode(&self) -> BackendModeKind;

    /// Answer a natural-language query.
    async fn process_query(&self, text: &str) -> Result<String, BackendError>;

    /// Generate a SQL statement for a natural-language query.
    async fn generate_sql(&self, text: &str) -> Result<String, BackendError>;
}

/// Backend selection, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendMode {
    /// No credential configured; answers are simulated.
    Offline,
    /// Credential configured; answers come from the live service.
    Live { api_key: String },
}

impl BackendMode {
    /// Pick a mode from an optional credential. Blank keys count as absent.
    #[must_use]
    pub fn from_api_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(key) if !key.trim().is_empty() => Self::Live { api_key: key },
            _ => Self::Offline,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> BackendModeKind {
        match self {
            Self::Offline => BackendModeKind::Offline,
            Self::Live { .. } => BackendModeKind::Live,
        }
    }
}

impl std::fmt::Debug for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the credential.
        match self {
            Self::Offline => write!(f, "Offline"),
            Self::Live { .. } => write!(f, "Live {{ api_key: <redacted> }}"),
        }
    }
}

/// Credential-free view of a [`BackendMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendModeKind {
    Offline,
    Live,
}

impl std::fmt::Display for BackendModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Build the backend for `mode`.
///
/// `settings` is only consulted for [`BackendMode::Live`].
///
/// # Errors
///
/// Returns an error if the HTTP client for the live backend cannot be built.
pub fn build(
    mode: BackendMode,
    settings: LiveSettings,
) -> Result<Arc<dyn QueryBackend>, BackendError> {
    match mode {
        BackendMode::Offline => {
            tracing::warn!("no API key configured, running in test mode");
            Ok(Arc::new(OfflineBackend))
        }
        BackendMode::Live { api_key } => {
            tracing::info!(model = %settings.model, "using live query backend");
            Ok(Arc::new(LiveBackend::new(api_key, settings)?))
        }
    }
}

/// Failure category reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The credential was missing or rejected.
    Auth,
    /// The account has run out of quota.
    QuotaExceeded,
    /// The service is throttling requests.
    RateLimited,
    /// Any other failure.
    Service,
}

impl BackendErrorKind {
    /// Whether this failure means the backend is unavailable rather than broken.
    #[must_use]
    pub const fn is_unavailable(self) -> bool {
        matches!(self, Self::Auth)
    }
}

/// Errors returned by a [`QueryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Invalid or missing credential.
    Auth,
    /// Quota exhausted.
    QuotaExceeded,
    /// Rate limited.
    RateLimited,
    /// Anything else, with a user-facing message.
    Service(String),
}

impl BackendError {
    #[must_use]
    pub const fn kind(&self) -> BackendErrorKind {
        match self {
            Self::Auth => BackendErrorKind::Auth,
            Self::QuotaExceeded => BackendErrorKind::QuotaExceeded,
            Self::RateLimited => BackendErrorKind::RateLimited,
            Self::Service(_) => BackendErrorKind::Service,
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "Invalid or missing OpenAI API key"),
            Self::QuotaExceeded => write!(f, "OpenAI API quota exceeded"),
            Self::RateLimited => write!(
                f,
                "OpenAI API rate limit exceeded. Please try again later."
            ),
            Self::Service(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for BackendError {}
