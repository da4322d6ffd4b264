//! Bakery Storefront client library.
//!
//! Keeps a local, observable cart view in step with the server-owned cart
//! resource, and wraps the account, catalog, order and payment endpoints of the bakery
//! REST API as typed clients.
//!
//! # Architecture
//!
//! - The server owns all business logic (pricing, inventory, payments). Every
//!   value shown locally is a mirror of a server response.
//! - [`session::SessionIdentityProvider`] mints the anonymous cart session id
//!   and persists it in [`storage::LocalStore`].
//! - [`api::ApiClient`] attaches the session id and access token to every
//!   request and refreshes the token pair on a 401. Services never build
//!   those headers themselves.
//! - [`services::cart::CartSynchronizer`] owns the single cart snapshot.
//! - [`state::Storefront`] wires everything together for one process.
//!
//! # Example
//!
//! ```rust,ignore
//! use bakery_storefront::{config::StorefrontConfig, state::Storefront};
//!
//! let storefront = Storefront::connect(StorefrontConfig::from_env()?).await?;
//! let cart = storefront.cart();
//!
//! cart.add_catalog_item(ProductId::new(1), 2, None).await;
//! println!("{} items, total {}", cart.item_count(), cart.total());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod environment;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

pub use environment::Environment;
pub use error::{Error, Result};
pub use state::Storefront;
