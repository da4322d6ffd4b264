//! Catalog client.
//!
//! Caches products, categories and home covers using `moka` (5-minute TTL).
//! Search queries always go to the server.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::api::{ApiClient, ApiError};
use crate::models::{Category, HomeCover, Product, ProductPage, ProductQuery};

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(ProductQuery),
    Featured { limit: u32 },
    Product(String),
    Categories,
    HomeCovers,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<ProductPage>),
    Featured(Arc<Vec<Product>>),
    Product(Box<Product>),
    Categories(Arc<Vec<Category>>),
    HomeCovers(Arc<Vec<HomeCover>>),
}

#[derive(Serialize)]
struct FeaturedQuery {
    limit: u32,
}

/// Read-only client for the product catalog.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api", &self.inner.api)
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish()
    }
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cacheable = query.search.is_none();
        let cache_key = CacheKey::Products(query.clone());

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok((*page).clone());
        }

        let page: ProductPage = self.inner.api.get_with_query("/products", query).await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(Arc::new(page.clone())))
                .await;
        }

        Ok(page)
    }

    /// Featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Featured { limit };

        if let Some(CacheValue::Featured(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok((*products).clone());
        }

        let products: Vec<Product> = self
            .inner
            .api
            .get_with_query("/products/featured", &FeaturedQuery { limit })
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Featured(Arc::new(products.clone())))
            .await;

        Ok(products)
    }

    /// A product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown slug, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn product(&self, slug: &str) -> Result<Product, ApiError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(ApiError::InvalidRequest("product slug is required".to_string()));
        }
        let cache_key = CacheKey::Product(slug.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .inner
            .api
            .get(&format!("/products/{}", urlencoding::encode(slug)))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Storefront content
    // =========================================================================

    /// Active categories, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok((*categories).clone());
        }

        let mut categories: Vec<Category> = self.inner.api.get("/categories").await?;
        categories.sort_by_key(|c| c.sort_order);

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::new(categories.clone())),
            )
            .await;

        Ok(categories)
    }

    /// Home page hero slides, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn home_covers(&self) -> Result<Vec<HomeCover>, ApiError> {
        if let Some(CacheValue::HomeCovers(covers)) =
            self.inner.cache.get(&CacheKey::HomeCovers).await
        {
            debug!("Cache hit for home covers");
            return Ok((*covers).clone());
        }

        let mut covers: Vec<HomeCover> = self.inner.api.get("/home-covers").await?;
        covers.sort_by_key(|c| c.sort_order);

        self.inner
            .cache
            .insert(
                CacheKey::HomeCovers,
                CacheValue::HomeCovers(Arc::new(covers.clone())),
            )
            .await;

        Ok(covers)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, slug: &str) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(slug.trim().to_string()))
            .await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Number of cached responses, after pending maintenance has run.
    pub async fn cached_entries(&self) -> u64 {
        self.inner.cache.run_pending_tasks().await;
        self.inner.cache.entry_count()
    }
}
