//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `LOOMLINE_API_BASE_URL` - Marketplace API root
//!   (default: `http://localhost:8000/api/v1`)
//! - `LOOMLINE_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `LOOMLINE_STATE_DIR` - Directory for persisted session/cart state;
//!   when unset, callers fall back to in-memory storage

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the marketplace REST API.
    pub api_base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Directory for persisted local state (token, user snapshot, cart).
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_env_or_default("LOOMLINE_API_BASE_URL", DEFAULT_API_BASE_URL)
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LOOMLINE_API_BASE_URL".to_string(), e.to_string())
            })?;

        let timeout_secs = get_env_or_default(
            "LOOMLINE_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("LOOMLINE_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let state_dir = get_optional_env("LOOMLINE_STATE_DIR").map(PathBuf::from);

        Ok(Self {
            api_base_url,
            timeout: Duration::from_secs(timeout_secs),
            state_dir,
        })
    }

    /// Build a configuration pointing at an explicit API root, with defaults
    /// for everything else. Used by tests and embedding applications.
    #[must_use]
    pub fn for_base_url(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state_dir: None,
        }
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_base_url_defaults() {
        let config =
            ClientConfig::for_base_url("http://localhost:8000/api/v1".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.state_dir.is_none());
    }

    #[test]
    fn test_default_base_url_parses() {
        let url: Url = DEFAULT_API_BASE_URL.parse().unwrap();
        assert_eq!(url.path(), "/api/v1");
    }
}
