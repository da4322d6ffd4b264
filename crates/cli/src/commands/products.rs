//! Catalog commands.

use bakery_storefront::Storefront;
use bakery_storefront::api::ApiError;
use bakery_storefront::models::{Product, ProductQuery, SortBy, SortOrder};

/// Build a listing query from command-line values.
pub fn query(
    page: Option<u32>,
    page_size: Option<u32>,
    category: Option<String>,
    search: Option<String>,
    featured: bool,
    sort_by: Option<SortBy>,
    desc: bool,
) -> ProductQuery {
    ProductQuery {
        page,
        page_size,
        category_slug: category,
        search,
        featured: featured.then_some(true),
        sort_by,
        sort_order: desc.then_some(SortOrder::Desc),
    }
}

/// Print one page of products.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn list(storefront: &Storefront, query: &ProductQuery) -> Result<(), ApiError> {
    let page = storefront.catalog().products(query).await?;
    for product in &page.items {
        print_summary(product);
    }
    println!(
        "Page {}/{} ({} products)",
        page.page, page.total_pages, page.total
    );
    Ok(())
}

/// Print featured products.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn featured(storefront: &Storefront, limit: u32) -> Result<(), ApiError> {
    for product in &storefront.catalog().featured(limit).await? {
        print_summary(product);
    }
    Ok(())
}

/// Print active categories.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn categories(storefront: &Storefront) -> Result<(), ApiError> {
    for category in &storefront.catalog().categories().await? {
        println!("[{}] {:<24} {}", category.id, category.name, category.slug);
    }
    Ok(())
}

/// Print the home page hero slides.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn covers(storefront: &Storefront) -> Result<(), ApiError> {
    for cover in &storefront.catalog().home_covers().await? {
        let alt = cover.alt_text.as_deref().unwrap_or("");
        println!("[{}] {} {alt}", cover.id, cover.image_url);
    }
    Ok(())
}

/// Print one product.
///
/// # Errors
///
/// Returns an error if the product does not exist or the API request fails.
#[allow(clippy::print_stdout)]
pub async fn show(storefront: &Storefront, slug: &str) -> Result<(), ApiError> {
    let product = storefront.catalog().product(slug).await?;
    print_summary(&product);
    let description = product
        .description
        .as_deref()
        .or(product.short_description.as_deref());
    if let Some(description) = description {
        println!("  {description}");
    }
    if let Some(image) = product.primary_image() {
        println!("  image: {image}");
    }
    println!("  stock: {}", product.stock);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_summary(product: &Product) {
    let sale = match product.compare_price {
        Some(compare) if product.is_on_sale() => format!(" (was {compare})"),
        _ => String::new(),
    };
    let stock = if product.in_stock() { "" } else { "  [sold out]" };
    println!(
        "[{}] {:<32} {}{sale}{stock}",
        product.id, product.name, product.price
    );
}
