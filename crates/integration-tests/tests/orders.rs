//! Checkout, order lookup and payment handoff against the stub bakery API.
//!
//! Run with: `cargo test -p bakery-integration-tests --test orders`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bakery_core::{DeliveryType, Email, Money, OrderStatus, Phone, ProductId};
use bakery_integration_tests::{DAILY_CAPACITY, StubBakery};
use bakery_storefront::Storefront;
use bakery_storefront::api::ApiError;
use bakery_storefront::models::CreateOrderRequest;
use bakery_storefront::storage::{LocalStore, MemoryStore, keys};
use chrono::NaiveDate;

fn checkout(delivery_type: DeliveryType) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Ana Pérez".to_string(),
        customer_email: Email::parse("ana@example.cl").unwrap(),
        customer_phone: Phone::parse("+56912345678").unwrap(),
        delivery_type,
        delivery_address: None,
        delivery_city: None,
        delivery_date: None,
        delivery_time_slot: None,
        notes: None,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
}

async fn connect(stub: &StubBakery, store: Arc<MemoryStore>) -> Storefront {
    Storefront::connect_with_store(stub.config(), store)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_checkout_and_payment_handoff() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;
    let cart = storefront.cart();
    cart.add_catalog_item(ProductId::new(1), 2, Some("Sin cerezas".to_string()))
        .await
        .unwrap();
    cart.add_catalog_item(ProductId::new(2), 1, None)
        .await
        .unwrap();
    let cart_total = cart.total();

    let order = storefront
        .orders()
        .create_order(&checkout(DeliveryType::Pickup))
        .await
        .unwrap();

    assert_eq!(order.order_number, "ORD-0001");
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.total, cart_total);
    assert_eq!(order.delivery_fee, Money::ZERO);
    assert_eq!(order.unit_count(), 3);
    assert_eq!(order.items[0].notes.as_deref(), Some("Sin cerezas"));
    assert!(order.can_pay());

    // The server consumed the cart.
    cart.refresh().await;
    assert!(cart.is_empty());

    let preference = storefront
        .orders()
        .create_payment_preference(&order.order_number)
        .await
        .unwrap();
    assert!(preference.init_point.contains(&preference.preference_id));

    let report = storefront
        .orders()
        .payment_status(&order.order_number)
        .await
        .unwrap();
    assert_eq!(report.status, OrderStatus::Paying);
    assert_eq!(report.payment_status.as_deref(), Some("pending"));

    let fetched = storefront.orders().order(&order.order_number).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Paying);
    assert!(!fetched.can_pay());
}

#[tokio::test]
async fn test_delivery_order_adds_fee() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;
    storefront
        .cart()
        .add_catalog_item(ProductId::new(1), 1, None)
        .await
        .unwrap();

    let mut request = checkout(DeliveryType::Delivery);
    request.delivery_address = Some("Av. Siempre Viva 742".to_string());
    request.delivery_city = Some("Temuco".to_string());
    request.delivery_date = Some(day(20));
    let order = storefront.orders().create_order(&request).await.unwrap();

    assert_eq!(order.delivery_fee, Money::from_units(3000));
    assert_eq!(order.total, Money::from_units(4000));
    assert_eq!(
        order.delivery_date.map(|dt| dt.date()),
        Some(day(20))
    );
}

#[tokio::test]
async fn test_delivery_without_address_is_rejected_locally() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;

    let err = storefront
        .orders()
        .create_order(&checkout(DeliveryType::Delivery))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert_eq!(stub.request_count("POST", "/orders"), 0);
}

#[tokio::test]
async fn test_empty_cart_checkout_reports_server_message() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;

    let err = storefront
        .orders()
        .create_order(&checkout(DeliveryType::Pickup))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("El carrito está vacío"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;

    let err = storefront.orders().order("ORD-9999").await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(ref message) if message == "Pedido no encontrado"));
}

#[tokio::test]
async fn test_paid_order_cannot_start_payment() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;
    storefront
        .cart()
        .add_catalog_item(ProductId::new(2), 1, None)
        .await
        .unwrap();
    let order = storefront
        .orders()
        .create_order(&checkout(DeliveryType::Pickup))
        .await
        .unwrap();

    stub.set_order_status(&order.order_number, OrderStatus::Paid);

    let err = storefront
        .orders()
        .create_payment_preference(&order.order_number)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(
        storefront
            .orders()
            .order(&order.order_number)
            .await
            .unwrap()
            .is_completed()
    );
}

#[tokio::test]
async fn test_my_orders_requires_access_token() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = connect(&stub, store.clone()).await;

    let err = storefront.orders().my_orders().await.unwrap_err();
    assert_eq!(err.status(), Some(401));

    stub.register_user("ana@example.cl", "secreto", "Ana Pérez");
    let tokens = stub.issue_tokens("ana@example.cl");
    store.set(keys::ACCESS_TOKEN, &tokens.access_token).unwrap();
    storefront
        .cart()
        .add_catalog_item(ProductId::new(1), 1, None)
        .await
        .unwrap();
    let order = storefront
        .orders()
        .create_order(&checkout(DeliveryType::Pickup))
        .await
        .unwrap();

    let orders = storefront.orders().my_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_number, order.order_number);

    // Another customer sees none of them.
    stub.register_user("luis@example.cl", "clave", "Luis Soto");
    let other = stub.issue_tokens("luis@example.cl");
    store.set(keys::ACCESS_TOKEN, &other.access_token).unwrap();
    assert!(storefront.orders().my_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_availability_reflects_reservations() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;
    storefront
        .cart()
        .add_catalog_item(ProductId::new(1), 4, None)
        .await
        .unwrap();
    let mut request = checkout(DeliveryType::Pickup);
    request.delivery_date = Some(day(21));
    storefront.orders().create_order(&request).await.unwrap();

    let availability = storefront
        .orders()
        .availability(day(20), day(23))
        .await
        .unwrap();

    assert_eq!(availability.dates.len(), 4);
    assert_eq!(availability.on(day(20)).unwrap().remaining(), DAILY_CAPACITY);
    assert_eq!(availability.on(day(21)).unwrap().reserved, 4);
    assert_eq!(availability.open_days().count(), 4);
}

#[tokio::test]
async fn test_invalid_availability_range_is_not_sent() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;

    let reversed = storefront.orders().availability(day(23), day(20)).await;
    let too_wide = storefront
        .orders()
        .availability(day(1), day(1) + chrono::Days::new(400))
        .await;

    assert!(matches!(reversed, Err(ApiError::InvalidRequest(_))));
    assert!(matches!(too_wide, Err(ApiError::InvalidRequest(_))));
    assert_eq!(stub.request_count("GET", "/orders/availability"), 0);
}
