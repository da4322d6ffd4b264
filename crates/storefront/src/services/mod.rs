//! Storefront services.
//!
//! # Services
//!
//! - `auth` - Login, registration and the signed-in profile
//! - `cart` - Local cart snapshot kept in sync with the server cart
//! - `orders` - Order placement, lookup and payment handoff
//! - `catalog` - Cached product, category and home cover reads

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use auth::AuthClient;
pub use cart::{CartOperation, CartSynchronizer, SyncState, UpdateStrategy};
pub use catalog::CatalogClient;
pub use orders::OrdersClient;
