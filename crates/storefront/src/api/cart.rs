//! Cart Resource endpoints.

use async_trait::async_trait;
use bakery_core::CartLineId;

use super::{ApiClient, ApiError};
use crate::models::{CartLineUpdate, CartSnapshot, CustomCartItem, NewCartItem};

/// The server-owned cart tied to the caller's session.
///
/// Every method returns the server's authoritative snapshot after the
/// change. The session is resolved server-side from the transport headers.
#[async_trait]
pub trait CartResource: Send + Sync {
    /// `GET /cart`.
    async fn fetch(&self) -> Result<CartSnapshot, ApiError>;

    /// `POST /cart/items`. The server merges lines by product.
    async fn add_item(&self, item: &NewCartItem) -> Result<CartSnapshot, ApiError>;

    /// `POST /cart/items/custom`.
    async fn add_custom_item(&self, item: &CustomCartItem) -> Result<CartSnapshot, ApiError>;

    /// `PUT /cart/items/{id}`.
    async fn update_item(
        &self,
        line: CartLineId,
        update: &CartLineUpdate,
    ) -> Result<CartSnapshot, ApiError>;

    /// `DELETE /cart/items/{id}`.
    async fn remove_item(&self, line: CartLineId) -> Result<CartSnapshot, ApiError>;

    /// `DELETE /cart`. `None` when the server answers without a body.
    async fn clear(&self) -> Result<Option<CartSnapshot>, ApiError>;
}

/// [`CartResource`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpCartResource {
    api: ApiClient,
}

impl HttpCartResource {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CartResource for HttpCartResource {
    async fn fetch(&self) -> Result<CartSnapshot, ApiError> {
        self.api.get("/cart").await
    }

    async fn add_item(&self, item: &NewCartItem) -> Result<CartSnapshot, ApiError> {
        self.api.post("/cart/items", item).await
    }

    async fn add_custom_item(&self, item: &CustomCartItem) -> Result<CartSnapshot, ApiError> {
        self.api.post("/cart/items/custom", item).await
    }

    async fn update_item(
        &self,
        line: CartLineId,
        update: &CartLineUpdate,
    ) -> Result<CartSnapshot, ApiError> {
        self.api.put(&format!("/cart/items/{line}"), update).await
    }

    async fn remove_item(&self, line: CartLineId) -> Result<CartSnapshot, ApiError> {
        self.api.delete(&format!("/cart/items/{line}")).await
    }

    async fn clear(&self) -> Result<Option<CartSnapshot>, ApiError> {
        self.api.delete_optional("/cart").await
    }
}
