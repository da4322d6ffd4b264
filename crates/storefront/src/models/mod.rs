//! Request and response types of the bakery REST API.
//!
//! Field names follow the wire format (`snake_case` JSON). Response types are
//! lenient: missing or `null` collections and counters decode as empty/zero.

pub mod auth;
pub mod cart;
pub mod order;
pub mod product;

pub use auth::{
    AuthTokens, ChangePasswordRequest, LoginRequest, MessageResponse, RefreshRequest,
    RegisterRequest, User,
};
pub use cart::{CartLine, CartLineUpdate, CartSnapshot, CustomCartItem, NewCartItem, ProductSnapshot};
pub use order::{
    Availability, CreateOrderRequest, DayAvailability, Order, OrderItem, PaymentPreference,
    PaymentStatusReport,
};
pub use product::{
    Category, HomeCover, Product, ProductImage, ProductPage, ProductQuery, SortBy, SortOrder,
};

use serde::{Deserialize, Deserializer};

/// Decode `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
