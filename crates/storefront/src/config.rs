//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAKERY_API_URL` - Base URL of the bakery REST API (e.g., `https://api.example.com/api/v1`)
//!
//! ## Optional
//! - `BAKERY_ENVIRONMENT` - `interactive` or `headless` (default: interactive)
//! - `BAKERY_STORAGE_PATH` - Local storage file (default: `<data dir>/bakery/storage.json`)
//! - `BAKERY_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `BAKERY_ACCESS_TOKEN` - Customer access token to seed into local storage
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::environment::Environment;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_url: String,
    /// Execution environment
    pub environment: Environment,
    /// Local storage file; `None` means the platform default
    pub storage_path: Option<PathBuf>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Access token to seed into local storage on connect
    pub access_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url)
            .field("environment", &self.environment)
            .field("storage_path", &self.storage_path)
            .field("request_timeout", &self.request_timeout)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Configuration for `api_url` with every optional setting at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an absolute
    /// `http(s)` URL.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url("BAKERY_API_URL", api_url)?,
            environment: Environment::default(),
            storage_path: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            access_token: None,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("BAKERY_API_URL")?;
        let mut config = Self::new(&api_url)?;

        config.environment = get_env_or_default("BAKERY_ENVIRONMENT", "interactive")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidEnvVar("BAKERY_ENVIRONMENT".to_string(), e))?;
        config.storage_path = get_optional_env("BAKERY_STORAGE_PATH").map(PathBuf::from);
        config.request_timeout = parse_timeout(
            "BAKERY_REQUEST_TIMEOUT_SECS",
            &get_env_or_default(
                "BAKERY_REQUEST_TIMEOUT_SECS",
                &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            ),
        )?;
        config.access_token = get_optional_env("BAKERY_ACCESS_TOKEN").map(SecretString::from);
        config.sentry_dsn = get_optional_env("SENTRY_DSN");
        config.sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(config)
    }

    /// Use a different execution environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Use a different request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate an API base URL and strip its trailing slash.
fn normalize_api_url(var_name: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must not contain a query or fragment".to_string(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parse a timeout in whole seconds (1..=300).
fn parse_timeout(var_name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if secs == 0 || secs > MAX_REQUEST_TIMEOUT_SECS {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds (got {secs})"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_api_url_strips_trailing_slash() {
        let url = normalize_api_url("TEST", "https://api.example.com/api/v1/").unwrap();
        assert_eq!(url, "https://api.example.com/api/v1");
    }

    #[test]
    fn test_normalize_api_url_rejects_bad_values() {
        assert!(matches!(
            normalize_api_url("TEST", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(normalize_api_url("TEST", "ftp://api.example.com").is_err());
        assert!(normalize_api_url("TEST", "https://api.example.com/?x=1").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("TEST", "10").unwrap(), Duration::from_secs(10));
        assert!(parse_timeout("TEST", "0").is_err());
        assert!(parse_timeout("TEST", "301").is_err());
        assert!(parse_timeout("TEST", "ten").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::new("http://localhost:8000").unwrap();
        assert_eq!(config.environment, Environment::Interactive);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.storage_path.is_none());
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let mut config = StorefrontConfig::new("http://localhost:8000").unwrap();
        config.access_token = Some(SecretString::from("super_secret_token_value"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }
}
