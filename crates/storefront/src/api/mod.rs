//! HTTP transport for the bakery REST API.
//!
//! # Architecture
//!
//! - [`ApiClient`] wraps `reqwest` and attaches identity headers
//!   (`X-Session-ID`, `Authorization: Bearer`) read from local storage on
//!   every request
//! - A 401 triggers one `POST /auth/refresh` and one retry with the new
//!   token; if the refresh fails both stored tokens are cleared
//! - The server is the source of truth; nothing is cached here
//! - [`CartResource`] is the seam the cart synchronizer depends on, with
//!   [`HttpCartResource`] as the production implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use bakery_storefront::api::{ApiClient, HttpCartResource, CartResource};
//!
//! let api = ApiClient::new(&config, store)?;
//! let cart = HttpCartResource::new(api).fetch().await?;
//! ```

mod cart;
mod client;

pub use cart::{CartResource, HttpCartResource};
pub use client::{ApiClient, REFRESH_PATH, SESSION_HEADER};

use thiserror::Error;

/// Errors that can occur when calling the bakery API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request rejected before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::Http(_) | Self::Parse(_) | Self::InvalidRequest(_) => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API answers errors as `{"detail": "..."}`, or with a list of field
/// errors (`{"detail": [{"msg": "...", "loc": [...]}]}`) for validation
/// failures. Anything else is truncated verbatim.
fn error_message(body: &str) -> String {
    const MAX_LEN: usize = 200;

    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(message)) => message,
        Some(serde_json::Value::Array(entries)) if !entries.is_empty() => entries
            .iter()
            .map(|entry| {
                entry
                    .get("msg")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| entry.to_string(), ToString::to_string)
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => "(empty response body)".to_string(),
        _ => body.chars().take(MAX_LEN).collect(),
    }
}
