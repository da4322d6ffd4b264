//! Accounts and token refresh against the stub bakery API.
//!
//! Run with: `cargo test -p bakery-integration-tests --test auth`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use bakery_core::Email;
use bakery_integration_tests::StubBakery;
use bakery_storefront::api::ApiError;
use bakery_storefront::models::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use bakery_storefront::storage::{LocalStore, MemoryStore, keys};
use bakery_storefront::{Environment, Error, Storefront};

const EMAIL: &str = "ana@example.cl";
const PASSWORD: &str = "secreto";

async fn connect(stub: &StubBakery, store: Arc<MemoryStore>) -> Storefront {
    Storefront::connect_with_store(stub.config(), store)
        .await
        .unwrap()
}

fn credentials(password: &str) -> LoginRequest {
    LoginRequest {
        email: Email::parse(EMAIL).unwrap(),
        password: password.to_string(),
    }
}

fn api_error(err: Error) -> ApiError {
    match err {
        Error::Api(e) => e,
        other => panic!("expected an API error, got {other}"),
    }
}

/// Register `EMAIL` on the stub and sign in through the client.
async fn signed_in(stub: &StubBakery, store: &Arc<MemoryStore>) -> Storefront {
    stub.register_user(EMAIL, PASSWORD, "Ana Pérez");
    let storefront = connect(stub, store.clone()).await;
    storefront.auth().login(&credentials(PASSWORD)).await.unwrap();
    storefront
}

#[tokio::test]
async fn test_login_stores_both_tokens() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    stub.register_user(EMAIL, PASSWORD, "Ana Pérez");
    let storefront = connect(&stub, store.clone()).await;
    assert!(!storefront.auth().is_signed_in());

    let user = storefront.auth().login(&credentials(PASSWORD)).await.unwrap();

    assert_eq!(user.email, EMAIL);
    assert_eq!(user.full_name, "Ana Pérez");
    assert!(storefront.auth().is_signed_in());
    assert!(store.get(keys::ACCESS_TOKEN).unwrap().is_some());
    assert!(store.get(keys::REFRESH_TOKEN).unwrap().is_some());

    let me = storefront.auth().me().await.unwrap();
    assert_eq!(me, user);
}

#[tokio::test]
async fn test_bad_credentials_store_nothing() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    stub.register_user(EMAIL, PASSWORD, "Ana Pérez");
    let storefront = connect(&stub, store.clone()).await;

    let err = api_error(
        storefront
            .auth()
            .login(&credentials("incorrecta"))
            .await
            .unwrap_err(),
    );

    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Email o contraseña incorrectos"));
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
}

#[tokio::test]
async fn test_register_signs_in_and_rejects_duplicates() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = connect(&stub, store.clone()).await;
    let request = RegisterRequest {
        email: Email::parse(EMAIL).unwrap(),
        password: PASSWORD.to_string(),
        full_name: "Ana Pérez".to_string(),
        phone: Some("+56912345678".parse().unwrap()),
    };

    let user = storefront.auth().register(&request).await.unwrap();
    assert_eq!(user.phone.as_deref(), Some("+56912345678"));
    assert!(storefront.auth().is_signed_in());

    let err = api_error(storefront.auth().register(&request).await.unwrap_err());
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("El email ya está registrado"));
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_once() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = signed_in(&stub, &store).await;
    let old_access = store.get(keys::ACCESS_TOKEN).unwrap();
    let old_refresh = store.get(keys::REFRESH_TOKEN).unwrap();

    stub.expire_access_tokens();
    let orders = storefront.orders().my_orders().await.unwrap();

    assert!(orders.is_empty());
    assert_eq!(stub.request_count("POST", "/auth/refresh"), 1);
    assert_eq!(stub.request_count("GET", "/orders"), 2);
    assert_ne!(store.get(keys::ACCESS_TOKEN).unwrap(), old_access);
    assert_ne!(store.get(keys::REFRESH_TOKEN).unwrap(), old_refresh);

    // The retry carried the new token.
    let last = stub.requests().into_iter().last().unwrap();
    assert_eq!(
        last.authorization,
        store
            .get(keys::ACCESS_TOKEN)
            .unwrap()
            .map(|token| format!("Bearer {token}"))
    );
}

#[tokio::test]
async fn test_failed_refresh_clears_both_tokens() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = signed_in(&stub, &store).await;

    stub.expire_access_tokens();
    stub.expire_refresh_tokens();
    let err = storefront.orders().my_orders().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(stub.request_count("POST", "/auth/refresh"), 1);
    assert_eq!(stub.request_count("GET", "/orders"), 1);
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
    assert!(!storefront.auth().is_signed_in());
    // The cart session is untouched.
    assert!(store.get(keys::CART_SESSION_ID).unwrap().is_some());
}

#[tokio::test]
async fn test_rejection_without_refresh_token_clears_access_token() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = connect(&stub, store.clone()).await;
    store.set(keys::ACCESS_TOKEN, "stale").unwrap();

    let err = storefront.orders().my_orders().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(stub.request_count("POST", "/auth/refresh"), 0);
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = signed_in(&stub, &store).await;

    stub.expire_access_tokens();
    let orders = storefront.orders();
    let auth = storefront.auth();
    let (first, second, profile) = tokio::join!(orders.my_orders(), orders.my_orders(), auth.me());

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(profile.unwrap().email, EMAIL);
    assert_eq!(stub.request_count("POST", "/auth/refresh"), 1);
}

#[tokio::test]
async fn test_change_password() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = signed_in(&stub, &store).await;

    let wrong = ChangePasswordRequest {
        current_password: "otra".to_string(),
        new_password: "nueva".to_string(),
    };
    let err = api_error(storefront.auth().change_password(&wrong).await.unwrap_err());
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("Contraseña actual incorrecta"));
    // A 400 is not an expired token; the session stays signed in.
    assert!(storefront.auth().is_signed_in());

    let right = ChangePasswordRequest {
        current_password: PASSWORD.to_string(),
        new_password: "nueva".to_string(),
    };
    let message = storefront.auth().change_password(&right).await.unwrap();
    assert_eq!(message, "Contraseña actualizada correctamente");
    assert_eq!(stub.password_of(EMAIL).as_deref(), Some("nueva"));
}

#[tokio::test]
async fn test_forgot_password_returns_message() {
    let stub = StubBakery::start().await;
    let storefront = connect(&stub, Arc::new(MemoryStore::new())).await;

    let message = storefront
        .auth()
        .forgot_password(&Email::parse("nadie@example.cl").unwrap())
        .await
        .unwrap();

    assert!(!message.is_empty());
}

#[tokio::test]
async fn test_logout_removes_tokens_and_keeps_session() {
    let stub = StubBakery::start().await;
    let store = Arc::new(MemoryStore::new());
    let storefront = signed_in(&stub, &store).await;
    let session_id = storefront.session_id();

    storefront.auth().logout().unwrap();

    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap(), None);
    assert_eq!(storefront.session_id(), session_id);

    let err = api_error(storefront.auth().me().await.unwrap_err());
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_headless_login_keeps_no_tokens() {
    let stub = StubBakery::start().await;
    stub.register_user(EMAIL, PASSWORD, "Ana Pérez");
    let store = Arc::new(MemoryStore::new());
    let config = stub.config().with_environment(Environment::Headless);
    let storefront = Storefront::connect_with_store(config, store.clone())
        .await
        .unwrap();

    let user = storefront.auth().login(&credentials(PASSWORD)).await.unwrap();

    assert_eq!(user.email, EMAIL);
    assert!(store.is_empty());
    assert!(!storefront.auth().is_signed_in());
}
