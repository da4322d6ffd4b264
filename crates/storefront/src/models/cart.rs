//! Cart resource types.

use std::collections::HashSet;

use bakery_core::{CartId, CartLineId, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Complete local mirror of the server cart at one point in time.
///
/// `id == 0` is the sentinel for "no cart yet / cleared". Money and counts
/// are copied from the server, never derived from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Server-assigned cart ID.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: CartId,
    /// Cart lines, in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<CartLine>,
    /// Server-computed total.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Money,
    /// Server-reported number of units across all lines.
    #[serde(default, deserialize_with = "null_as_default")]
    pub item_count: u32,
}

impl CartSnapshot {
    /// The empty sentinel: `{id: 0, items: [], total: 0, item_count: 0}`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether this is the empty sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.id.is_zero() && self.items.is_empty() && self.total.is_zero() && self.item_count == 0
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Find the line holding a catalog product.
    #[must_use]
    pub fn line_for_product(&self, product: ProductId) -> Option<&CartLine> {
        self.items
            .iter()
            .find(|line| line.product_id == Some(product))
    }

    /// Enforce unique line IDs, keeping the first occurrence of each.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let before = self.items.len();
        let mut seen = HashSet::with_capacity(before);
        self.items.retain(|line| seen.insert(line.id));

        if self.items.len() != before {
            tracing::warn!(
                cart_id = %self.id,
                dropped = before - self.items.len(),
                "Cart response contained duplicate line ids"
            );
        }
        self
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-assigned line ID, unique within a cart.
    pub id: CartLineId,
    /// Catalog product; `None` for custom one-off items.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Display copy of the product captured by the server when added.
    pub product: ProductSnapshot,
    /// Units on this line.
    pub quantity: u32,
    /// Free-text instructions.
    #[serde(default)]
    pub notes: Option<String>,
    /// Server-computed line subtotal.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtotal: Money,
}

impl CartLine {
    /// Whether the line is a custom item rather than a catalog product.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        self.product_id.is_none()
    }
}

/// Denormalized product data embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product ID (zero for custom items).
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    /// Unit price at add time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Money,
    /// Main image URL.
    #[serde(default)]
    pub main_image: Option<String>,
}

/// Body of `POST /cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// Catalog product to add.
    pub product_id: ProductId,
    /// Units to add (merged into an existing line for the same product).
    pub quantity: u32,
    /// Free-text instructions.
    pub notes: Option<String>,
}

/// Body of `POST /cart/items/custom`: an ad-hoc item without a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCartItem {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Units to add.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Image shown next to the line.
    pub image_url: Option<String>,
    /// Free-text instructions.
    pub notes: Option<String>,
}

const fn default_quantity() -> u32 {
    1
}

impl CustomCartItem {
    /// A single unit of `name` at `price`.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            price,
            quantity: default_quantity(),
            image_url: None,
            notes: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Body of `PUT /cart/items/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineUpdate {
    /// New absolute quantity.
    pub quantity: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i64, product: Option<i64>, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            product_id: product.map(ProductId::new),
            product: ProductSnapshot {
                id: ProductId::new(product.unwrap_or(0)),
                name: "Torta".to_string(),
                slug: "torta".to_string(),
                price: Money::from_units(1000),
                main_image: None,
            },
            quantity,
            notes: None,
            subtotal: Money::from_units(1000 * i64::from(quantity)),
        }
    }

    #[test]
    fn test_missing_fields_normalize_to_empty() {
        let snapshot: CartSnapshot = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(snapshot.id, CartId::new(4));
        assert!(snapshot.items.is_empty());
        assert!(snapshot.total.is_zero());
        assert_eq!(snapshot.item_count, 0);
    }

    #[test]
    fn test_null_fields_normalize_to_empty() {
        let snapshot: CartSnapshot =
            serde_json::from_str(r#"{"id": 4, "items": null, "total": null, "item_count": null}"#)
                .unwrap();
        assert!(snapshot.items.is_empty());
        assert!(snapshot.total.is_zero());
    }

    #[test]
    fn test_decodes_server_payload() {
        let json = r#"{
            "id": 9,
            "items": [
                {
                    "id": 31,
                    "product_id": 1,
                    "product": {"id": 1, "name": "Torta Selva Negra", "slug": "selva-negra", "price": 1000.0, "main_image": null},
                    "quantity": 2,
                    "notes": null,
                    "subtotal": 2000.0
                },
                {
                    "id": 32,
                    "product_id": null,
                    "product": {"id": 0, "name": "Torta personalizada", "slug": "torta-personalizada", "price": 15000.0, "main_image": "/uploads/x.png"},
                    "quantity": 1,
                    "notes": "Feliz cumple",
                    "subtotal": 15000.0
                }
            ],
            "total": 17000.0,
            "item_count": 3
        }"#;

        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.total, Money::from_units(17_000));
        assert_eq!(snapshot.item_count, 3);
        assert!(!snapshot.items[0].is_custom());
        assert!(snapshot.items[1].is_custom());
        assert_eq!(
            snapshot.line_for_product(ProductId::new(1)).map(|l| l.quantity),
            Some(2)
        );
    }

    #[test]
    fn test_normalized_drops_duplicate_line_ids() {
        let snapshot = CartSnapshot {
            id: CartId::new(1),
            items: vec![line(1, Some(1), 2), line(2, Some(2), 1), line(1, Some(1), 5)],
            total: Money::from_units(3000),
            item_count: 3,
        }
        .normalized();

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.line(CartLineId::new(1)).map(|l| l.quantity), Some(2));
    }

    #[test]
    fn test_empty_is_sentinel() {
        let empty = CartSnapshot::empty();
        assert!(empty.is_sentinel());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_custom_item_body() {
        let item = CustomCartItem::new("Torta unicornio", Money::from_units(25_000))
            .with_image_url("/uploads/unicornio.png");
        let body = serde_json::to_value(&item).unwrap();

        assert_eq!(body["name"], "Torta unicornio");
        assert_eq!(body["quantity"], 1);
        assert!(body["price"].is_number());
        assert_eq!(body["image_url"], "/uploads/unicornio.png");
        assert!(body["notes"].is_null());
    }
}
