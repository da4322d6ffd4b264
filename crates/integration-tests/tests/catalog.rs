//! Catalog reads and caching against the stub bakery API.
//!
//! Run with: `cargo test -p bakery-integration-tests --test catalog`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bakery_integration_tests::StubBakery;
use bakery_storefront::Storefront;
use bakery_storefront::api::ApiError;
use bakery_storefront::models::{ProductQuery, SortBy, SortOrder};
use bakery_storefront::storage::MemoryStore;

async fn connect(stub: &StubBakery) -> Storefront {
    Storefront::connect_with_store(stub.config(), Arc::new(MemoryStore::new()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_product_lookups_are_cached() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;
    let catalog = storefront.catalog();

    let first = catalog.product("selva-negra").await.unwrap();
    let second = catalog.product("selva-negra").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(stub.request_count("GET", "/products/selva-negra"), 1);
    assert_eq!(catalog.cached_entries().await, 1);

    catalog.invalidate_product("selva-negra").await;
    catalog.product("selva-negra").await.unwrap();
    assert_eq!(stub.request_count("GET", "/products/selva-negra"), 2);
}

#[tokio::test]
async fn test_listing_filters_and_sorts() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;

    let page = storefront
        .catalog()
        .products(&ProductQuery {
            category_slug: Some("tortas".to_string()),
            sort_by: Some(SortBy::Price),
            sort_order: Some(SortOrder::Desc),
            ..ProductQuery::default()
        })
        .await
        .unwrap();

    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Pie de limón", "Torta Selva Negra"]);
    assert_eq!(page.total, 2);
    assert!(!page.has_next());
    assert!(!page.items[0].in_stock());
}

#[tokio::test]
async fn test_paging() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;

    let page = storefront
        .catalog()
        .products(&ProductQuery {
            page: Some(1),
            page_size: Some(2),
            ..ProductQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next());
}

#[tokio::test]
async fn test_search_is_never_cached() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;
    let query = ProductQuery {
        search: Some("KUCHEN".to_string()),
        ..ProductQuery::default()
    };

    let page = storefront.catalog().products(&query).await.unwrap();
    storefront.catalog().products(&query).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].is_on_sale());
    assert_eq!(stub.request_count("GET", "/products"), 2);
}

#[tokio::test]
async fn test_featured_products() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;

    let featured = storefront.catalog().featured(1).await.unwrap();
    assert_eq!(featured.len(), 1);
    assert!(featured[0].is_featured);

    let all = storefront.catalog().featured(8).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(stub.request_count("GET", "/products/featured"), 2);

    storefront.catalog().featured(8).await.unwrap();
    assert_eq!(stub.request_count("GET", "/products/featured"), 2);
}

#[tokio::test]
async fn test_unknown_product_is_not_found_and_not_cached() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;

    let err = storefront.catalog().product("croissant").await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(storefront.catalog().cached_entries().await, 0);
}

#[tokio::test]
async fn test_categories_sorted_and_cached() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;
    let catalog = storefront.catalog();

    let categories = catalog.categories().await.unwrap();
    let slugs: Vec<&str> = categories.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, ["tortas", "kuchen"]);

    catalog.categories().await.unwrap();
    assert_eq!(stub.request_count("GET", "/categories"), 1);

    catalog.invalidate_all().await;
    catalog.categories().await.unwrap();
    assert_eq!(stub.request_count("GET", "/categories"), 2);
}

#[tokio::test]
async fn test_home_covers() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub).await;

    let covers = storefront.catalog().home_covers().await.unwrap();

    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].alt_text.as_deref(), Some("Vitrina de tortas"));
    storefront.catalog().home_covers().await.unwrap();
    assert_eq!(stub.request_count("GET", "/home-covers"), 1);
}
