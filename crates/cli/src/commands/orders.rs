//! Order and payment commands.

use bakery_storefront::Storefront;
use bakery_storefront::api::ApiError;
use bakery_storefront::models::{CreateOrderRequest, Order};
use chrono::NaiveDate;

/// Print capacity per day.
///
/// # Errors
///
/// Returns an error if the range is invalid or the API request fails.
#[allow(clippy::print_stdout)]
pub async fn availability(
    storefront: &Storefront,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), ApiError> {
    let availability = storefront.orders().availability(from, to).await?;

    for (date, day) in &availability.dates {
        let marker = if day.is_full() { "full" } else { "open" };
        println!(
            "{date}  {marker:<4}  {}/{} reserved",
            day.reserved, day.capacity
        );
    }
    Ok(())
}

/// Place an order and print it.
///
/// # Errors
///
/// Returns an error if the request is incomplete or the API request fails.
pub async fn create(storefront: &Storefront, request: &CreateOrderRequest) -> Result<(), ApiError> {
    let order = storefront.orders().create_order(request).await?;
    print_order(&order);

    // The server empties the cart once the order exists.
    storefront.cart().refresh().await;
    Ok(())
}

/// Print one order.
///
/// # Errors
///
/// Returns an error if the order does not exist or the API request fails.
pub async fn show(storefront: &Storefront, number: &str) -> Result<(), ApiError> {
    let order = storefront.orders().order(number).await?;
    print_order(&order);
    Ok(())
}

/// Print the signed-in customer's orders.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[allow(clippy::print_stdout)]
pub async fn list(storefront: &Storefront) -> Result<(), ApiError> {
    let orders = storefront.orders().my_orders().await?;
    if orders.is_empty() {
        println!("No orders");
    }
    for order in &orders {
        println!(
            "{}  {}  {:<20}  {}",
            order.created_at.date(),
            order.order_number,
            order.status.label(),
            order.total
        );
    }
    Ok(())
}

/// Create a payment checkout and print its URL.
///
/// # Errors
///
/// Returns an error if the order cannot be paid or the API request fails.
#[allow(clippy::print_stdout)]
pub async fn pay(storefront: &Storefront, number: &str) -> Result<(), ApiError> {
    let order = storefront.orders().order(number).await?;
    if !order.can_pay() {
        return Err(ApiError::InvalidRequest(format!(
            "order {} is {} and cannot be paid",
            order.order_number,
            order.status.label()
        )));
    }

    let preference = storefront
        .orders()
        .create_payment_preference(&order.order_number)
        .await?;
    println!("Pay at: {}", preference.init_point);
    Ok(())
}

/// Print the payment status of an order.
///
/// # Errors
///
/// Returns an error if the order does not exist or the API request fails.
#[allow(clippy::print_stdout)]
pub async fn payment_status(storefront: &Storefront, number: &str) -> Result<(), ApiError> {
    let report = storefront.orders().payment_status(number).await?;
    println!(
        "{}  {}  payment: {}",
        report.order_number,
        report.status.label(),
        report.payment_status.as_deref().unwrap_or("-")
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    println!(
        "Order {}  {} ({})",
        order.order_number,
        order.status.label(),
        order.delivery_type
    );
    for item in &order.items {
        println!(
            "  {} x{}  {}",
            item.product_name, item.quantity, item.subtotal
        );
    }
    if !order.delivery_fee.is_zero() {
        println!("  delivery {}", order.delivery_fee);
    }
    if !order.discount.is_zero() {
        println!("  discount -{}", order.discount);
    }
    println!("  total {}", order.total);
    if order.is_completed() {
        println!("  paid");
    }
}
