//! Storefront context shared by every consumer of one visitor's session.

use std::sync::Arc;

use bakery_core::SessionId;
use secrecy::ExposeSecret;
use tracing::info;

use crate::api::{ApiClient, HttpCartResource};
use crate::config::StorefrontConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::services::{AuthClient, CartSynchronizer, CatalogClient, OrdersClient};
use crate::session::SessionIdentityProvider;
use crate::storage::{FileStore, LocalStore, MemoryStore, keys};

/// Everything one storefront session needs, wired together.
///
/// This struct is cheaply cloneable via `Arc`; all clones share the same
/// cart snapshot, session and connection pool.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    store: Arc<dyn LocalStore>,
    session: SessionIdentityProvider,
    api: ApiClient,
    cart: CartSynchronizer,
    auth: AuthClient,
    orders: OrdersClient,
    catalog: CatalogClient,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session_id", &self.inner.session.session_id())
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Open local storage and connect.
    ///
    /// Storage is the file at `config.storage_path`, or the platform default
    /// location. A headless context without a configured path gets a
    /// process-local store instead.
    ///
    /// # Errors
    ///
    /// Returns an error if storage is unavailable or unwritable, or the HTTP
    /// client cannot be built.
    pub async fn connect(config: StorefrontConfig) -> Result<Self> {
        let store: Arc<dyn LocalStore> = match (&config.storage_path, config.environment) {
            (Some(path), _) => Arc::new(FileStore::new(path)),
            (None, Environment::Interactive) => Arc::new(FileStore::at_default_path()?),
            (None, Environment::Headless) => Arc::new(MemoryStore::new()),
        };
        Self::connect_with_store(config, store).await
    }

    /// Connect using an existing store.
    ///
    /// Seeds the configured access token, ensures the session identifier,
    /// then hydrates the cart. In a headless context the first two steps are
    /// skipped and the cart starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the token or session identifier cannot be
    /// persisted, or the HTTP client cannot be built.
    pub async fn connect_with_store(
        config: StorefrontConfig,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self> {
        let environment = config.environment;

        if let Some(token) = &config.access_token
            && environment.attaches_identity()
        {
            store.set(keys::ACCESS_TOKEN, token.expose_secret())?;
        }

        let session = SessionIdentityProvider::new(store.clone(), environment);
        session.ensure_session_id()?;

        let api = ApiClient::new(&config, store.clone())?;
        let cart = CartSynchronizer::new(
            Arc::new(HttpCartResource::new(api.clone())),
            environment,
        );
        cart.hydrate().await;

        info!(
            api_url = %config.api_url,
            environment = %environment,
            items = cart.item_count(),
            "Storefront connected"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                auth: AuthClient::new(api.clone()),
                orders: OrdersClient::new(api.clone()),
                catalog: CatalogClient::new(api.clone()),
                config,
                store,
                session,
                api,
                cart,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.inner.config.environment
    }

    /// Get a reference to the local store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.inner.store
    }

    /// Get a reference to the session identity provider.
    #[must_use]
    pub fn session(&self) -> &SessionIdentityProvider {
        &self.inner.session
    }

    /// Current session identifier; `None` in a headless context.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.session.session_id()
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the cart synchronizer.
    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    /// Get a reference to the account client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the orders client.
    #[must_use]
    pub fn orders(&self) -> &OrdersClient {
        &self.inner.orders
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }
}
