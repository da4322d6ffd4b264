//! Cart commands.
//!
//! Every command prints the cart after it ran. A failed mutation still prints
//! the resynchronized cart before reporting the error.

use bakery_core::{CartLineId, Money, ProductId};
use bakery_storefront::Storefront;
use bakery_storefront::models::{CartSnapshot, CustomCartItem};
use bakery_storefront::services::CartOperation;
use rust_decimal::Decimal;

use super::CommandError;

/// Print the cart loaded on connect.
pub fn show(storefront: &Storefront) {
    print_cart(&storefront.cart().snapshot());
}

/// Add a catalog product.
///
/// # Errors
///
/// Returns `CommandError::CartRejected` if the server refused the change.
pub async fn add(
    storefront: &Storefront,
    product: ProductId,
    quantity: u32,
    notes: Option<String>,
) -> Result<(), CommandError> {
    let result = storefront
        .cart()
        .add_catalog_item(product, quantity, notes)
        .await;
    finish(storefront, result, CartOperation::AddCatalogItem)
}

/// Build a custom item from command-line values.
pub fn custom_item(
    name: String,
    price: Decimal,
    quantity: u32,
    image_url: Option<String>,
    notes: Option<String>,
) -> CustomCartItem {
    CustomCartItem {
        name,
        price: Money::new(price),
        quantity,
        image_url,
        notes,
    }
}

/// Add a custom item.
///
/// # Errors
///
/// Returns `CommandError::CartRejected` if the server refused the change.
pub async fn add_custom(storefront: &Storefront, item: CustomCartItem) -> Result<(), CommandError> {
    let result = storefront.cart().add_custom_item(item).await;
    finish(storefront, result, CartOperation::AddCustomItem)
}

/// Set the quantity of a line.
///
/// # Errors
///
/// Returns `CommandError::CartRejected` if the server refused the change.
pub async fn update(
    storefront: &Storefront,
    line: CartLineId,
    quantity: i64,
) -> Result<(), CommandError> {
    let result = storefront.cart().update_quantity(line, quantity).await;
    finish(storefront, result, CartOperation::UpdateQuantity)
}

/// Remove a line.
///
/// # Errors
///
/// Returns `CommandError::CartRejected` if the server refused the change.
pub async fn remove(storefront: &Storefront, line: CartLineId) -> Result<(), CommandError> {
    let result = storefront.cart().remove_item(line).await;
    finish(storefront, result, CartOperation::RemoveItem)
}

/// Empty the cart.
pub async fn clear(storefront: &Storefront) {
    storefront.cart().clear_cart().await;
    print_cart(&storefront.cart().snapshot());
}

fn finish(
    storefront: &Storefront,
    result: Option<CartSnapshot>,
    operation: CartOperation,
) -> Result<(), CommandError> {
    match result {
        Some(snapshot) => {
            print_cart(&snapshot);
            Ok(())
        }
        None => {
            print_cart(&storefront.cart().snapshot());
            Err(CommandError::CartRejected(operation))
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Cart is empty");
        return;
    }

    println!("Cart #{}", snapshot.id);
    for line in &snapshot.items {
        let custom = if line.is_custom() { " (custom)" } else { "" };
        println!(
            "  [{}] {}{} x{}  {}",
            line.id, line.product.name, custom, line.quantity, line.subtotal
        );
        if let Some(notes) = &line.notes {
            println!("        {notes}");
        }
    }
    println!("  {} items, total {}", snapshot.item_count, snapshot.total);
}
