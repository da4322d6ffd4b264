//! Session identity command.

use bakery_storefront::Storefront;

/// Print the session id created or loaded on connect.
#[allow(clippy::print_stdout)]
pub fn show(storefront: &Storefront) {
    match storefront.session_id() {
        Some(id) => println!("{id}"),
        None => println!(
            "No session id ({} context has no durable identity)",
            storefront.environment()
        ),
    }
}
