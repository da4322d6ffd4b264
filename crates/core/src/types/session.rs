//! Anonymous session identifier.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque per-device correlation token tying an anonymous visitor to a
/// server-side cart.
///
/// This is a correlation key, not a credential: it only has to be unique with
/// overwhelming probability and safe to place in a URL or HTTP header.
///
/// ```
/// use bakery_core::SessionId;
///
/// let id = SessionId::generate();
/// assert!(id.as_str().starts_with("sess_"));
/// assert!(id.as_str().len() > 10);
/// assert_eq!(SessionId::parse(id.as_str()), Some(id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Prefix of generated identifiers.
    pub const PREFIX: &'static str = "sess_";

    /// Synthesize a new identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    /// Accept a previously persisted identifier.
    ///
    /// Returns `None` for blank values or values that could not travel in an
    /// HTTP header (whitespace, control or non-ASCII characters).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_id_is_header_safe() {
        let id = SessionId::generate();
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_parse_rejects_blank_and_unsafe() {
        assert_eq!(SessionId::parse(""), None);
        assert_eq!(SessionId::parse("   "), None);
        assert_eq!(SessionId::parse("sess with space"), None);
        assert_eq!(SessionId::parse("sess_ñ"), None);
    }

    #[test]
    fn test_parse_keeps_legacy_values() {
        // Identifiers minted by older clients use a base36 body
        let parsed = SessionId::parse("sess_k3j2h1g0f9lzx8a1");
        assert_eq!(parsed.map(SessionId::into_inner).as_deref(), Some("sess_k3j2h1g0f9lzx8a1"));
    }
}
