//! Cart synchronization.
//!
//! [`CartSynchronizer`] owns the one local [`CartSnapshot`] of a storefront
//! and every transition into or out of it. Readers get pure projections of
//! the current snapshot, or a [`watch::Receiver`] that is notified on every
//! replacement.
//!
//! # Update strategies
//!
//! Operations follow one of two named strategies (see
//! [`CartOperation::strategy`]):
//!
//! - [`UpdateStrategy::Reconciling`]: send the request, then replace the
//!   snapshot with the server's answer. On failure, refetch the whole cart.
//! - [`UpdateStrategy::Optimistic`]: reset the snapshot first, then tell the
//!   server. On failure, keep the local result. Only `clear_cart` works
//!   this way.
//!
//! # Ordering
//!
//! Requests are not queued. Concurrent mutations are applied in the order
//! their responses arrive, so the last response to complete wins even when
//! it belongs to an earlier action.

use std::fmt;
use std::sync::Arc;

use bakery_core::{CartLineId, Money, ProductId};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, CartResource};
use crate::environment::Environment;
use crate::error::add_breadcrumb;
use crate::models::{CartLine, CartLineUpdate, CartSnapshot, CustomCartItem, NewCartItem};

// =============================================================================
// Strategies and state
// =============================================================================

/// How an operation moves the local snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Wait for the server, then adopt its snapshot.
    Reconciling,
    /// Change the local snapshot first, then confirm with the server.
    Optimistic,
}

/// The operations a [`CartSynchronizer`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    Refresh,
    AddCatalogItem,
    AddCustomItem,
    UpdateQuantity,
    RemoveItem,
    ClearCart,
}

impl CartOperation {
    /// The update strategy the operation follows.
    #[must_use]
    pub const fn strategy(self) -> UpdateStrategy {
        match self {
            Self::ClearCart => UpdateStrategy::Optimistic,
            Self::Refresh
            | Self::AddCatalogItem
            | Self::AddCustomItem
            | Self::UpdateQuantity
            | Self::RemoveItem => UpdateStrategy::Reconciling,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::AddCatalogItem => "add_catalog_item",
            Self::AddCustomItem => "add_custom_item",
            Self::UpdateQuantity => "update_quantity",
            Self::RemoveItem => "remove_item",
            Self::ClearCart => "clear_cart",
        }
    }
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a synchronizer. There is no error state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Constructed; nothing fetched yet.
    #[default]
    Uninitialized,
    /// Initial fetch in flight.
    Hydrating,
    /// Hydration finished. Every later operation stays here.
    Synced,
}

// =============================================================================
// CartSynchronizer
// =============================================================================

/// Owner of the local cart snapshot.
pub struct CartSynchronizer {
    resource: Arc<dyn CartResource>,
    environment: Environment,
    snapshot: watch::Sender<CartSnapshot>,
    state: RwLock<SyncState>,
}

impl fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("environment", &self.environment)
            .field("state", &*self.state.read())
            .field("snapshot", &*self.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl CartSynchronizer {
    /// Create a synchronizer holding the empty snapshot.
    ///
    /// Call [`hydrate`](Self::hydrate) to load the server cart.
    #[must_use]
    pub fn new(resource: Arc<dyn CartResource>, environment: Environment) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::empty());
        Self {
            resource,
            environment,
            snapshot,
            state: RwLock::new(SyncState::Uninitialized),
        }
    }

    /// Initial load: `Uninitialized -> Hydrating -> Synced`.
    ///
    /// Does nothing where background sync is not allowed
    /// ([`Environment::Headless`]); the synchronizer then stays
    /// `Uninitialized`.
    pub async fn hydrate(&self) {
        if !self.environment.allows_background_sync() {
            debug!(environment = %self.environment, "Skipping cart hydration");
            return;
        }

        *self.state.write() = SyncState::Hydrating;
        self.refresh().await;
        *self.state.write() = SyncState::Synced;
    }

    /// Replace the snapshot with the server cart.
    ///
    /// Best effort: on failure the prior snapshot is kept. A no-op where
    /// background sync is not allowed.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        if !self.environment.allows_background_sync() {
            return;
        }

        match self.resource.fetch().await {
            Ok(snapshot) => {
                self.apply(snapshot);
            }
            Err(e) => {
                warn!(error = %e, "Cart refresh failed, keeping previous snapshot");
                add_breadcrumb(
                    "cart",
                    "Cart refresh failed",
                    Some(&[("error", e.to_string().as_str())]),
                );
            }
        }
    }

    /// Add `quantity` units of a catalog product.
    ///
    /// The server merges the units into an existing line for the same
    /// product. Returns the new snapshot, or `None` after a failure (the
    /// snapshot has then been resynchronized from the server).
    #[instrument(skip(self, notes), fields(product_id = %product))]
    pub async fn add_catalog_item(
        &self,
        product: ProductId,
        quantity: u32,
        notes: Option<String>,
    ) -> Option<CartSnapshot> {
        let operation = CartOperation::AddCatalogItem;

        if quantity == 0 {
            let e = ApiError::InvalidRequest("quantity must be at least 1".to_string());
            self.resync_after(operation, &e).await;
            return None;
        }

        let item = NewCartItem {
            product_id: product,
            quantity,
            notes,
        };
        match self.resource.add_item(&item).await {
            Ok(snapshot) => Some(self.apply(snapshot)),
            Err(e) => {
                self.resync_after(operation, &e).await;
                None
            }
        }
    }

    /// Add a free-form item with no catalog entry.
    ///
    /// Same result and failure handling as
    /// [`add_catalog_item`](Self::add_catalog_item).
    #[instrument(skip(self, item), fields(name = %item.name, quantity = item.quantity))]
    pub async fn add_custom_item(&self, item: CustomCartItem) -> Option<CartSnapshot> {
        match self.resource.add_custom_item(&item).await {
            Ok(snapshot) => Some(self.apply(snapshot)),
            Err(e) => {
                self.resync_after(CartOperation::AddCustomItem, &e).await;
                None
            }
        }
    }

    /// Set the quantity of a line. `quantity <= 0` removes the line.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn update_quantity(&self, line: CartLineId, quantity: i64) -> Option<CartSnapshot> {
        if quantity <= 0 {
            return self.remove_item(line).await;
        }

        let operation = CartOperation::UpdateQuantity;
        let Ok(quantity) = u32::try_from(quantity) else {
            let e = ApiError::InvalidRequest(format!("quantity {quantity} is out of range"));
            self.resync_after(operation, &e).await;
            return None;
        };

        match self
            .resource
            .update_item(line, &CartLineUpdate { quantity })
            .await
        {
            Ok(snapshot) => Some(self.apply(snapshot)),
            Err(e) => {
                self.resync_after(operation, &e).await;
                None
            }
        }
    }

    /// Remove a line.
    ///
    /// Removing a line the server does not know degrades to a resync.
    #[instrument(skip(self), fields(line_id = %line))]
    pub async fn remove_item(&self, line: CartLineId) -> Option<CartSnapshot> {
        match self.resource.remove_item(line).await {
            Ok(snapshot) => Some(self.apply(snapshot)),
            Err(e) => {
                self.resync_after(CartOperation::RemoveItem, &e).await;
                None
            }
        }
    }

    /// Empty the cart.
    ///
    /// The snapshot is reset to the empty sentinel before the request is
    /// sent. A snapshot in the server's answer is adopted; on failure the
    /// cart stays empty.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) {
        self.snapshot.send_replace(CartSnapshot::empty());

        match self.resource.clear().await {
            Ok(Some(snapshot)) => {
                self.apply(snapshot);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Cart clear failed on the server, keeping local empty cart");
                add_breadcrumb(
                    "cart",
                    "Cart clear failed",
                    Some(&[("error", e.to_string().as_str())]),
                );
            }
        }
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Lines of the current snapshot.
    #[must_use]
    pub fn items(&self) -> Vec<CartLine> {
        self.snapshot.borrow().items.clone()
    }

    /// Server-computed total of the current snapshot.
    #[must_use]
    pub fn total(&self) -> Money {
        self.snapshot.borrow().total
    }

    /// Server-reported unit count of the current snapshot.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.snapshot.borrow().item_count
    }

    /// Whether the current snapshot has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    /// Observe snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply(&self, snapshot: CartSnapshot) -> CartSnapshot {
        let snapshot = snapshot.normalized();
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    async fn resync_after(&self, operation: CartOperation, error: &ApiError) {
        warn!(
            operation = operation.as_str(),
            error = %error,
            "Cart mutation failed, resynchronizing"
        );
        add_breadcrumb(
            "cart",
            "Cart mutation failed",
            Some(&[
                ("operation", operation.as_str()),
                ("error", error.to_string().as_str()),
            ]),
        );
        self.refresh().await;
    }
}
