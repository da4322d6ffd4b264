//! Anonymous session identity.
//!
//! Every visitor gets a [`SessionId`] the first time the storefront runs on a
//! device profile. The id is persisted under [`keys::CART_SESSION_ID`] and
//! never rotated; the API transport sends it with every request so the server
//! can find the visitor's cart.

use std::sync::Arc;

use bakery_core::SessionId;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::storage::{LocalStore, StorageError, keys};

/// Produces and persists the anonymous session identifier.
#[derive(Debug)]
pub struct SessionIdentityProvider {
    store: Arc<dyn LocalStore>,
    environment: Environment,
    current: RwLock<Option<SessionId>>,
}

impl SessionIdentityProvider {
    /// Create a provider. Nothing is read or written until
    /// [`ensure_session_id`](Self::ensure_session_id) runs.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, environment: Environment) -> Self {
        Self {
            store,
            environment,
            current: RwLock::new(None),
        }
    }

    /// Return the persisted identifier, minting and persisting one if the
    /// device has none yet.
    ///
    /// In a [`Environment::Headless`] context this is a no-op that returns
    /// `None` and leaves the identifier unset.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read, or if a freshly minted
    /// identifier cannot be persisted.
    pub fn ensure_session_id(&self) -> Result<Option<SessionId>, StorageError> {
        if !self.environment.has_durable_storage() {
            debug!(environment = %self.environment, "Skipping session bootstrap");
            return Ok(None);
        }

        let mut current = self.current.write();
        if let Some(id) = current.as_ref() {
            return Ok(Some(id.clone()));
        }

        let stored = self.store.get(keys::CART_SESSION_ID)?;
        if let Some(id) = stored.as_deref().and_then(SessionId::parse) {
            debug!("Reusing persisted session id");
            *current = Some(id.clone());
            return Ok(Some(id));
        }
        if stored.is_some() {
            warn!("Discarding unusable persisted session id");
        }

        let id = SessionId::generate();
        self.store.set(keys::CART_SESSION_ID, id.as_str())?;
        info!("Created new anonymous session");
        *current = Some(id.clone());
        Ok(Some(id))
    }

    /// The identifier held by this provider, without side effects.
    ///
    /// `None` until [`ensure_session_id`](Self::ensure_session_id) has run
    /// (and always `None` in a headless context).
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.current.read().clone()
    }
}
