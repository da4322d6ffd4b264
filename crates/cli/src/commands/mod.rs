//! Command implementations.
//!
//! Output goes to stdout; logs go to stderr.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod session;

use thiserror::Error;

use bakery_storefront::services::CartOperation;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A cart mutation failed. The local cart was resynchronized from the
    /// server and printed.
    #[error("cart {0} failed; showing the cart as the server has it")]
    CartRejected(CartOperation),

    /// The bakery API call failed.
    #[error(transparent)]
    Api(#[from] bakery_storefront::api::ApiError),
}
