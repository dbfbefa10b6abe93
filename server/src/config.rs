//! Server configuration module.
//!
//! This module provides configuration loading for the ChainQuery server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `CHAINQUERY_LISTEN_PORT`: Port to listen on (default: `3001`)
//! - `CHAINQUERY_ENVIRONMENT`: `development` or `production` (default: `development`)
//! - `OPENAI_API_KEY`: Credential for the live backend (optional; absent or blank
//!   selects the offline backend)
//! - `OPENAI_BASE_URL`: Chat completions base URL (default: `https://api.openai.com/v1`)
//! - `OPENAI_MODEL`: Chat model (default: `gpt-3.5-turbo`)
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number (1-65535)
//! - The backend mode is resolved here once and never re-read from the
//!   environment afterwards

use crate::backend::{BackendMode, LiveSettings};

/// Deployment environment.
///
/// Controls whether internal error details are exposed in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Whether error details may be sent to clients.
    #[must_use]
    pub const fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue {
                name: "CHAINQUERY_ENVIRONMENT".to_string(),
                message: format!("'{other}' is not one of: development, production"),
            }),
        }
    }
}

/// Server configuration.
///
/// # Post-conditions
///
/// - `listen_port` is always in the valid range (1-65535)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// Which backend to build.
    pub backend_mode: BackendMode,
    /// Connection settings for the live backend.
    pub live: LiveSettings,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3001;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `CHAINQUERY_LISTEN_PORT` is set but not a valid port number
    /// - `CHAINQUERY_ENVIRONMENT` is set but not a known environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_port = Self::load_listen_port(lookup("CHAINQUERY_LISTEN_PORT"))?;
        let environment = lookup("CHAINQUERY_ENVIRONMENT")
            .map_or(Ok(Environment::Development), |value| value.parse())?;
        let backend_mode = BackendMode::from_api_key(lookup("OPENAI_API_KEY"));
        let defaults = LiveSettings::default();
        let live = LiveSettings {
            base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: lookup("OPENAI_MODEL").unwrap_or(defaults.model),
        };

        Ok(Self {
            listen_port,
            environment,
            backend_mode,
            live,
        })
    }

    /// Parse the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port(value: Option<String>) -> Result<u16, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::DEFAULT_PORT);
        };
        match value.parse::<u16>() {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(ConfigError::InvalidValue {
                name: "CHAINQUERY_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_port, 3001);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.backend_mode, BackendMode::Offline);
        assert_eq!(config.live, LiveSettings::default());
    }

    #[test]
    fn test_api_key_selects_live_mode() {
        let config = load(&[("OPENAI_API_KEY", "sk-abc"), ("OPENAI_MODEL", "gpt-4o")]).unwrap();
        assert_eq!(
            config.backend_mode,
            BackendMode::Live {
                api_key: "sk-abc".to_string()
            }
        );
        assert_eq!(config.live.model, "gpt-4o");
    }

    #[test]
    fn test_blank_api_key_is_offline() {
        let config = load(&[("OPENAI_API_KEY", "")]).unwrap();
        assert_eq!(config.backend_mode, BackendMode::Offline);
    }

    #[test]
    fn test_invalid_port_rejected() {
        for bad in ["abc", "0", "70000"] {
            let error = load(&[("CHAINQUERY_LISTEN_PORT", bad)]).unwrap_err();
            assert!(matches!(error, ConfigError::InvalidValue { .. }));
        }
        assert_eq!(
            load(&[("CHAINQUERY_LISTEN_PORT", "8080")]).unwrap().listen_port,
            8080
        );
    }

    #[test]
    fn test_environment_parsing() {
        let config = load(&[("CHAINQUERY_ENVIRONMENT", "Production")]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.environment.exposes_error_details());
        assert!(load(&[("CHAINQUERY_ENVIRONMENT", "staging")]).is_err());
    }

    #[test]
    fn test_config_error_display_invalid() {
        let error = ConfigError::InvalidValue {
            name: "TEST_VAR".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
