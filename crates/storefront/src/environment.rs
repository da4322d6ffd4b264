//! Execution environment descriptor.
//!
//! Passed explicitly at construction so components never inspect the platform
//! to decide whether side effects may run.

use std::fmt;
use std::str::FromStr;

/// Where the storefront client is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// A user-facing process with durable per-profile storage and network
    /// access. Session bootstrap, hydration and background sync all run.
    #[default]
    Interactive,
    /// A rendering or batch context without per-profile storage. Identity
    /// bootstrap and background sync are no-ops; explicit mutations still
    /// reach the server.
    Headless,
}

impl Environment {
    /// Whether durable per-profile storage is available.
    #[must_use]
    pub const fn has_durable_storage(self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether best-effort background reads (hydration, resync) may run.
    #[must_use]
    pub const fn allows_background_sync(self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether requests should carry identity headers read from storage.
    #[must_use]
    pub const fn attaches_identity(self) -> bool {
        matches!(self, Self::Interactive)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::Headless => write!(f, "headless"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "headless" => Ok(Self::Headless),
            other => Err(format!("invalid environment: {other}")),
        }
    }
}
