//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error type (`ConfigError`, `StorageError`,
//! `ApiError`); [`Error`] wraps them for callers that drive the whole
//! storefront, such as the CLI.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The bakery API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Add a breadcrumb for a storefront event.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error. Without an initialized Sentry client this is a
/// no-op.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Cart mutation failed", Some(&[("operation", "remove_item")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Warning,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(ApiError::NotFound("Pedido no encontrado".to_string()));
        assert_eq!(err.to_string(), "API error: Not found: Pedido no encontrado");

        let err = Error::from(ConfigError::MissingEnvVar("BAKERY_API_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: BAKERY_API_URL"
        );

        let err = Error::from(StorageError::Unavailable("no data directory"));
        assert_eq!(
            err.to_string(),
            "Storage error: no durable storage available: no data directory"
        );
    }

    #[test]
    fn test_breadcrumb_without_client_is_noop() {
        add_breadcrumb("cart", "refresh failed", Some(&[("status", "503")]));
        add_breadcrumb("cart", "refresh failed", None);
    }
}
