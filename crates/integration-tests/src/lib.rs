//! Integration tests for the bakery storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bakery-integration-tests
//! ```
//!
//! The tests need no external services: [`StubBakery`] serves the auth,
//! cart, orders, payments and catalog endpoints from memory on a random local
//! port, with the merge and validation rules of the real API.
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart synchronizer over real HTTP
//! - `session_identity` - Session id persistence and transport headers
//! - `orders` - Order placement and payment handoff
//! - `catalog` - Product, category and home cover reads and caching
//! - `auth` - Login, registration and token refresh

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bakery_core::{
    CartId, CartLineId, CategoryId, DeliveryType, HomeCoverId, Money, OrderId, OrderItemId,
    OrderStatus, ProductId, UserId,
};
use bakery_storefront::config::StorefrontConfig;
use bakery_storefront::models::{
    AuthTokens, Availability, CartLine, CartLineUpdate, CartSnapshot, Category,
    ChangePasswordRequest, CreateOrderRequest, CustomCartItem, DayAvailability, HomeCover,
    LoginRequest, NewCartItem, Order, OrderItem, PaymentPreference, PaymentStatusReport, Product,
    ProductPage, ProductQuery, ProductSnapshot, RefreshRequest, RegisterRequest, SortBy,
    SortOrder, User,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

/// Daily capacity reported by the availability endpoint.
pub const DAILY_CAPACITY: u32 = 10;

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: &'static str,
    pub path: String,
    pub session_id: Option<String>,
    pub authorization: Option<String>,
}

// =============================================================================
// Stub server
// =============================================================================

/// In-memory bakery API on a random local port.
///
/// Carts are keyed by the `X-Session-ID` header; requests without one share
/// an anonymous cart.
pub struct StubBakery {
    addr: SocketAddr,
    state: Shared,
    shutdown: tokio::sync::watch::Sender<bool>,
}

type Shared = Arc<Mutex<StubState>>;

impl StubBakery {
    /// Start a stub server with the default catalog.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState::new()));
        let (shutdown, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let api = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/me", get(me))
            .route("/auth/change-password", post(change_password))
            .route("/auth/forgot-password", post(forgot_password))
            .route("/categories", get(categories))
            .route("/home-covers", get(home_covers))
            .route("/cart", get(get_cart).delete(clear_cart))
            .route("/cart/items", post(add_item))
            .route("/cart/items/custom", post(add_custom_item))
            .route("/cart/items/{id}", put(update_item).delete(remove_item))
            .route("/orders", get(my_orders).post(create_order))
            .route("/orders/availability", get(availability))
            .route("/orders/{number}", get(get_order))
            .route("/payments/preference/{number}", post(payment_preference))
            .route("/payments/status/{number}", get(payment_status))
            .route("/products", get(list_products))
            .route("/products/featured", get(featured_products))
            .route("/products/{slug}", get(get_product))
            .route("/health", get(health));

        let app = Router::new().nest("/api/v1", api).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    /// Base URL of the API (`http://127.0.0.1:<port>/api/v1`).
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Interactive client configuration pointed at this server.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::new(&self.api_url()).unwrap()
    }

    /// Answer the next `count` requests with `503`.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// Answer every request with `503` until turned off.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Hold the answer to the next request for `delay`. The request is
    /// processed before the wait.
    pub fn delay_next(&self, delay: Duration) {
        self.state.lock().delays.push_back(delay);
    }

    /// Answer `DELETE /cart` with the emptied cart instead of `204`.
    pub fn set_clear_returns_snapshot(&self, enabled: bool) {
        self.state.lock().clear_returns_snapshot = enabled;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received for `method path`.
    #[must_use]
    pub fn request_count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Server-side cart of a session.
    #[must_use]
    pub fn cart_of(&self, session_id: &str) -> Option<CartSnapshot> {
        self.state.lock().carts.get(session_id).cloned()
    }

    /// Put `quantity` units of a catalog product in a session's cart.
    pub fn seed_cart(&self, session_id: &str, product: i64, quantity: u32) {
        let mut state = self.state.lock();
        state
            .add_catalog(session_id, ProductId::new(product), quantity, None)
            .unwrap();
    }

    /// Create an account without going through the API.
    pub fn register_user(&self, email: &str, password: &str, full_name: &str) {
        self.state.lock().add_user(email, password, full_name).unwrap();
    }

    /// Issue a token pair for a registered user without going through the
    /// API.
    #[must_use]
    pub fn issue_tokens(&self, email: &str) -> AuthTokens {
        self.state.lock().issue_tokens(email)
    }

    /// Invalidate every access token issued so far, as if they expired.
    pub fn expire_access_tokens(&self) {
        self.state.lock().access_tokens.clear();
    }

    /// Invalidate every refresh token issued so far.
    pub fn expire_refresh_tokens(&self) {
        self.state.lock().refresh_tokens.clear();
    }

    /// Current password of an account.
    #[must_use]
    pub fn password_of(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .users
            .get(email)
            .map(|user| user.password.clone())
    }

    /// Force the status of a stored order.
    pub fn set_order_status(&self, number: &str, status: OrderStatus) {
        if let Some(stored) = self.state.lock().orders.get_mut(number) {
            stored.order.status = status;
        }
    }
}

impl Drop for StubBakery {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// An API URL on a port with nothing listening.
pub async fn closed_api_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/v1")
}

// =============================================================================
// State
// =============================================================================

struct StoredOrder {
    order: Order,
    /// Email of the signed-in customer who placed it.
    owner: Option<String>,
}

struct StubUser {
    id: i64,
    full_name: String,
    phone: Option<String>,
    password: String,
}

struct CatalogEntry {
    product: Product,
    category: &'static str,
}

struct StubState {
    carts: HashMap<String, CartSnapshot>,
    catalog: Vec<CatalogEntry>,
    orders: BTreeMap<String, StoredOrder>,
    reservations: HashMap<NaiveDate, u32>,
    users: BTreeMap<String, StubUser>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    next_cart: i64,
    next_line: i64,
    next_order: i64,
    next_user: i64,
    next_token: u64,
    fail_next: usize,
    offline: bool,
    clear_returns_snapshot: bool,
    delays: VecDeque<Duration>,
    requests: Vec<CapturedRequest>,
}

/// An error answer in the API's `{"detail": ...}` shape.
#[derive(Debug)]
struct StubError {
    status: StatusCode,
    detail: serde_json::Value,
}

impl StubError {
    fn new(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            detail: json!(detail),
        }
    }

    fn validation(field: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{"loc": ["body", field], "msg": msg, "type": "value_error"}]),
        }
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type StubResult = Result<Response, StubError>;

fn product(
    id: i64,
    name: &str,
    slug: &str,
    price: i64,
    stock: i64,
    featured: bool,
) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        slug: slug.to_string(),
        description: Some(format!("{name} artesanal")),
        short_description: None,
        price: Money::from_units(price),
        compare_price: None,
        stock,
        is_featured: featured,
        images: Vec::new(),
        main_image: Some(format!("/uploads/{slug}.jpg")),
        category_id: None,
        meta_title: None,
        meta_description: None,
    }
}

impl StubState {
    fn new() -> Self {
        let mut kuchen = product(2, "Kuchen de nuez", "kuchen-nuez", 8990, 5, true);
        kuchen.compare_price = Some(Money::from_units(9990));

        Self {
            carts: HashMap::new(),
            catalog: vec![
                CatalogEntry {
                    product: product(1, "Torta Selva Negra", "selva-negra", 1000, 10, true),
                    category: "tortas",
                },
                CatalogEntry {
                    product: kuchen,
                    category: "kuchen",
                },
                CatalogEntry {
                    product: product(3, "Pie de limón", "pie-limon", 6500, 0, false),
                    category: "tortas",
                },
            ],
            orders: BTreeMap::new(),
            reservations: HashMap::new(),
            users: BTreeMap::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            next_cart: 0,
            next_line: 0,
            next_order: 0,
            next_user: 0,
            next_token: 0,
            fail_next: 0,
            offline: false,
            clear_returns_snapshot: false,
            delays: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    fn add_user(&mut self, email: &str, password: &str, full_name: &str) -> Result<(), StubError> {
        if self.users.contains_key(email) {
            return Err(StubError::new(
                StatusCode::BAD_REQUEST,
                "El email ya está registrado",
            ));
        }
        self.next_user += 1;
        self.users.insert(
            email.to_string(),
            StubUser {
                id: self.next_user,
                full_name: full_name.to_string(),
                phone: None,
                password: password.to_string(),
            },
        );
        Ok(())
    }

    fn issue_tokens(&mut self, email: &str) -> AuthTokens {
        self.next_token += 1;
        let access_token = format!("access-{}", self.next_token);
        let refresh_token = format!("refresh-{}", self.next_token);
        self.access_tokens
            .insert(access_token.clone(), email.to_string());
        self.refresh_tokens
            .insert(refresh_token.clone(), email.to_string());
        AuthTokens {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }

    /// Email of the customer the request's bearer token belongs to.
    fn signed_in(&self, request: &CapturedRequest) -> Result<String, StubError> {
        let token = request
            .authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| StubError::new(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
        self.access_tokens
            .get(token)
            .cloned()
            .ok_or_else(|| StubError::new(StatusCode::UNAUTHORIZED, "Token inválido"))
    }

    fn user(&self, email: &str) -> Result<User, StubError> {
        let user = self
            .users
            .get(email)
            .ok_or_else(|| StubError::new(StatusCode::UNAUTHORIZED, "Token inválido"))?;
        Ok(User {
            id: UserId::new(user.id),
            email: email.to_string(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            address: None,
            city: None,
            is_active: true,
            is_admin: false,
        })
    }

    fn cart(&mut self, session: &str) -> &mut CartSnapshot {
        let next_cart = &mut self.next_cart;
        self.carts.entry(session.to_string()).or_insert_with(|| {
            *next_cart += 1;
            CartSnapshot {
                id: CartId::new(*next_cart),
                ..CartSnapshot::default()
            }
        })
    }

    fn add_catalog(
        &mut self,
        session: &str,
        product_id: ProductId,
        quantity: u32,
        notes: Option<String>,
    ) -> Result<CartSnapshot, StubError> {
        if quantity == 0 {
            return Err(StubError::validation("quantity", "Input should be greater than 0"));
        }
        let product = self
            .catalog
            .iter()
            .find(|entry| entry.product.id == product_id)
            .map(|entry| entry.product.clone())
            .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Producto no encontrado"))?;

        self.next_line += 1;
        let line_id = CartLineId::new(self.next_line);
        let cart = self.cart(session);

        if let Some(line) = cart
            .items
            .iter_mut()
            .find(|line| line.product_id == Some(product_id))
        {
            line.quantity += quantity;
            if notes.is_some() {
                line.notes = notes;
            }
        } else {
            cart.items.push(CartLine {
                id: line_id,
                product_id: Some(product_id),
                product: ProductSnapshot {
                    id: product.id,
                    name: product.name,
                    slug: product.slug,
                    price: product.price,
                    main_image: product.main_image,
                },
                quantity,
                notes,
                subtotal: Money::ZERO,
            });
        }
        recompute(cart);
        Ok(cart.clone())
    }
}

fn recompute(cart: &mut CartSnapshot) {
    for line in &mut cart.items {
        line.subtotal = Money::new(line.product.price.amount() * Decimal::from(line.quantity));
    }
    cart.total = Money::new(cart.items.iter().map(|line| line.subtotal.amount()).sum());
    cart.item_count = cart.items.iter().map(|line| line.quantity).sum();
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Record the request, apply failure injection and delays, then run `f`.
async fn respond(
    state: &Shared,
    method: &'static str,
    path: String,
    headers: &HeaderMap,
    f: impl FnOnce(&mut StubState, &CapturedRequest) -> StubResult,
) -> Response {
    let (delay, response) = {
        let mut stub = state.lock();
        let request = CapturedRequest {
            method,
            path,
            session_id: header(headers, "x-session-id"),
            authorization: header(headers, "authorization"),
        };
        stub.requests.push(request.clone());
        let delay = stub.delays.pop_front();

        let response = if stub.offline {
            Err(StubError::new(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"))
        } else if stub.fail_next > 0 {
            stub.fail_next -= 1;
            Err(StubError::new(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"))
        } else {
            f(&mut *stub, &request)
        };
        (delay, response.unwrap_or_else(IntoResponse::into_response))
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

fn session_key(request: &CapturedRequest) -> String {
    request.session_id.clone().unwrap_or_default()
}

fn ok<T: serde::Serialize>(value: &T) -> StubResult {
    Ok(Json(value).into_response())
}

// =============================================================================
// Auth handlers
// =============================================================================

async fn register(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Response {
    respond(&state, "POST", "/auth/register".to_string(), &headers, |stub, _| {
        let email = body.email.to_string();
        stub.add_user(&email, &body.password, &body.full_name)?;
        if let Some(user) = stub.users.get_mut(&email) {
            user.phone = body.phone.map(|phone| phone.to_string());
        }
        ok(&stub.issue_tokens(&email))
    })
    .await
}

async fn login(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Response {
    respond(&state, "POST", "/auth/login".to_string(), &headers, |stub, _| {
        let email = body.email.to_string();
        let matches = stub
            .users
            .get(&email)
            .is_some_and(|user| user.password == body.password);
        if !matches {
            return Err(StubError::new(
                StatusCode::UNAUTHORIZED,
                "Email o contraseña incorrectos",
            ));
        }
        ok(&stub.issue_tokens(&email))
    })
    .await
}

async fn refresh(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<RefreshRequest>,
) -> Response {
    respond(&state, "POST", "/auth/refresh".to_string(), &headers, |stub, _| {
        let email = stub
            .refresh_tokens
            .remove(&body.refresh_token)
            .ok_or_else(|| StubError::new(StatusCode::UNAUTHORIZED, "Token inválido"))?;
        ok(&stub.issue_tokens(&email))
    })
    .await
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/auth/me".to_string(), &headers, |stub, request| {
        let email = stub.signed_in(request)?;
        ok(&stub.user(&email)?)
    })
    .await
}

async fn change_password(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordRequest>,
) -> Response {
    respond(
        &state,
        "POST",
        "/auth/change-password".to_string(),
        &headers,
        |stub, request| {
            let email = stub.signed_in(request)?;
            let user = stub
                .users
                .get_mut(&email)
                .ok_or_else(|| StubError::new(StatusCode::UNAUTHORIZED, "Token inválido"))?;
            if user.password != body.current_password {
                return Err(StubError::new(
                    StatusCode::BAD_REQUEST,
                    "Contraseña actual incorrecta",
                ));
            }
            user.password = body.new_password;
            ok(&json!({"message": "Contraseña actualizada correctamente"}))
        },
    )
    .await
}

#[derive(Deserialize)]
struct ForgotPasswordBody {
    #[serde(default)]
    email: String,
}

async fn forgot_password(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ForgotPasswordBody>,
) -> Response {
    respond(
        &state,
        "POST",
        "/auth/forgot-password".to_string(),
        &headers,
        |_, _| {
            if body.email.trim().is_empty() {
                return Err(StubError::new(StatusCode::BAD_REQUEST, "Email requerido"));
            }
            ok(&json!({
                "message": "Si el email está registrado, recibirás instrucciones para restablecer tu contraseña"
            }))
        },
    )
    .await
}

// =============================================================================
// Cart handlers
// =============================================================================

async fn health(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/health".to_string(), &headers, |_, _| {
        ok(&json!({"status": "ok"}))
    })
    .await
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/cart".to_string(), &headers, |stub, request| {
        ok(&stub.cart(&session_key(request)).clone())
    })
    .await
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(item): Json<NewCartItem>,
) -> Response {
    respond(&state, "POST", "/cart/items".to_string(), &headers, |stub, request| {
        let cart = stub.add_catalog(&session_key(request), item.product_id, item.quantity, item.notes)?;
        ok(&cart)
    })
    .await
}

async fn add_custom_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(item): Json<CustomCartItem>,
) -> Response {
    respond(
        &state,
        "POST",
        "/cart/items/custom".to_string(),
        &headers,
        |stub, request| {
            if item.price.amount() <= Decimal::ZERO || item.quantity == 0 {
                return Err(StubError::new(
                    StatusCode::BAD_REQUEST,
                    "Precio y cantidad deben ser positivos",
                ));
            }
            stub.next_line += 1;
            let line_id = stub.next_line;
            let cart = stub.cart(&session_key(request));
            cart.items.push(CartLine {
                id: CartLineId::new(line_id),
                product_id: None,
                product: ProductSnapshot {
                    id: ProductId::default(),
                    name: item.name,
                    slug: format!("custom-{line_id}"),
                    price: item.price,
                    main_image: item.image_url,
                },
                quantity: item.quantity,
                notes: item.notes,
                subtotal: Money::ZERO,
            });
            recompute(cart);
            ok(&cart.clone())
        },
    )
    .await
}

async fn update_item(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<CartLineUpdate>,
) -> Response {
    respond(&state, "PUT", format!("/cart/items/{id}"), &headers, |stub, request| {
        if update.quantity == 0 {
            return Err(StubError::validation("quantity", "Input should be greater than 0"));
        }
        let cart = stub.cart(&session_key(request));
        let line = cart
            .items
            .iter_mut()
            .find(|line| line.id == CartLineId::new(id))
            .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Item no encontrado en el carrito"))?;
        line.quantity = update.quantity;
        recompute(cart);
        ok(&cart.clone())
    })
    .await
}

async fn remove_item(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    respond(&state, "DELETE", format!("/cart/items/{id}"), &headers, |stub, request| {
        let cart = stub.cart(&session_key(request));
        let before = cart.items.len();
        cart.items.retain(|line| line.id != CartLineId::new(id));
        if cart.items.len() == before {
            return Err(StubError::new(
                StatusCode::NOT_FOUND,
                "Item no encontrado en el carrito",
            ));
        }
        recompute(cart);
        ok(&cart.clone())
    })
    .await
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "DELETE", "/cart".to_string(), &headers, |stub, request| {
        let returns_snapshot = stub.clear_returns_snapshot;
        let cart = stub.cart(&session_key(request));
        cart.items.clear();
        recompute(cart);
        if returns_snapshot {
            ok(&cart.clone())
        } else {
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    })
    .await
}

// =============================================================================
// Order and payment handlers
// =============================================================================

#[derive(Deserialize)]
struct AvailabilityParams {
    from_date: NaiveDate,
    to_date: NaiveDate,
}

async fn availability(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<AvailabilityParams>,
) -> Response {
    respond(
        &state,
        "GET",
        "/orders/availability".to_string(),
        &headers,
        |stub, _| {
            if params.from_date > params.to_date {
                return Err(StubError::new(
                    StatusCode::BAD_REQUEST,
                    "from_date debe ser anterior a to_date",
                ));
            }
            if (params.to_date - params.from_date).num_days() > 365 {
                return Err(StubError::new(
                    StatusCode::BAD_REQUEST,
                    "El rango no puede superar 365 días",
                ));
            }
            let dates = params
                .from_date
                .iter_days()
                .take_while(|day| *day <= params.to_date)
                .map(|day| {
                    let reserved = stub.reservations.get(&day).copied().unwrap_or(0);
                    (
                        day,
                        DayAvailability {
                            reserved,
                            capacity: DAILY_CAPACITY,
                        },
                    )
                })
                .collect();
            ok(&Availability { dates })
        },
    )
    .await
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Response {
    respond(&state, "POST", "/orders".to_string(), &headers, |stub, request| {
        let cart = stub.cart(&session_key(request)).clone();
        if cart.items.is_empty() {
            return Err(StubError::new(StatusCode::BAD_REQUEST, "El carrito está vacío"));
        }
        if body.delivery_type == DeliveryType::Delivery && body.delivery_address.is_none() {
            return Err(StubError::new(
                StatusCode::BAD_REQUEST,
                "La dirección es obligatoria para delivery",
            ));
        }

        stub.next_order += 1;
        let number = format!("ORD-{:04}", stub.next_order);
        let delivery_fee = match body.delivery_type {
            DeliveryType::Delivery => Money::from_units(3000),
            DeliveryType::Pickup => Money::ZERO,
        };
        if let Some(date) = body.delivery_date {
            *stub.reservations.entry(date).or_insert(0) += cart.item_count;
        }

        let items = cart
            .items
            .iter()
            .enumerate()
            .map(|(index, line)| OrderItem {
                id: OrderItemId::new(i64::try_from(index).unwrap() + 1),
                product_id: line.product_id,
                product_name: line.product.name.clone(),
                product_price: line.product.price,
                product_image: line.product.main_image.clone(),
                quantity: line.quantity,
                subtotal: line.subtotal,
                notes: line.notes.clone(),
            })
            .collect();

        let order = Order {
            id: OrderId::new(stub.next_order),
            order_number: number.clone(),
            customer_name: body.customer_name,
            customer_email: body.customer_email.to_string(),
            customer_phone: body.customer_phone.to_string(),
            delivery_type: body.delivery_type,
            delivery_address: body.delivery_address,
            delivery_city: body.delivery_city,
            delivery_date: body
                .delivery_date
                .and_then(|date| date.and_hms_opt(0, 0, 0)),
            delivery_time_slot: body.delivery_time_slot,
            notes: body.notes,
            status: OrderStatus::Created,
            subtotal: cart.total,
            delivery_fee,
            discount: Money::ZERO,
            total: Money::new(cart.total.amount() + delivery_fee.amount()),
            payment_method: None,
            payment_status: None,
            items,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let cart = stub.cart(&session_key(request));
        cart.items.clear();
        recompute(cart);

        let owner = stub.signed_in(request).ok();
        stub.orders.insert(
            number,
            StoredOrder {
                order: order.clone(),
                owner,
            },
        );
        Ok((StatusCode::CREATED, Json(order)).into_response())
    })
    .await
}

async fn get_order(
    State(state): State<Shared>,
    Path(number): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(&state, "GET", format!("/orders/{number}"), &headers, |stub, _| {
        stub.orders
            .get(&number)
            .map(|stored| Json(stored.order.clone()).into_response())
            .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Pedido no encontrado"))
    })
    .await
}

async fn my_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/orders".to_string(), &headers, |stub, request| {
        let email = stub.signed_in(request)?;
        let orders: Vec<Order> = stub
            .orders
            .values()
            .filter(|stored| stored.owner.as_ref() == Some(&email))
            .map(|stored| stored.order.clone())
            .collect();
        ok(&orders)
    })
    .await
}

async fn payment_preference(
    State(state): State<Shared>,
    Path(number): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(
        &state,
        "POST",
        format!("/payments/preference/{number}"),
        &headers,
        |stub, _| {
            let stored = stub
                .orders
                .get_mut(&number)
                .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Pedido no encontrado"))?;
            if !stored.order.can_pay() {
                return Err(StubError::new(
                    StatusCode::BAD_REQUEST,
                    "El pedido no puede ser pagado",
                ));
            }
            stored.order.status = OrderStatus::Paying;
            stored.order.payment_status = Some("pending".to_string());
            let preference_id = format!("pref-{number}");
            ok(&PaymentPreference {
                init_point: format!("https://pay.example.com/checkout?pref_id={preference_id}"),
                preference_id,
            })
        },
    )
    .await
}

async fn payment_status(
    State(state): State<Shared>,
    Path(number): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(
        &state,
        "GET",
        format!("/payments/status/{number}"),
        &headers,
        |stub, _| {
            let stored = stub
                .orders
                .get(&number)
                .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Pedido no encontrado"))?;
            ok(&PaymentStatusReport {
                order_number: number.clone(),
                status: stored.order.status.clone(),
                payment_status: stored.order.payment_status.clone(),
                payment_method: stored.order.payment_method.clone(),
            })
        },
    )
    .await
}

// =============================================================================
// Catalog handlers
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ProductQuery>,
) -> Response {
    respond(&state, "GET", "/products".to_string(), &headers, |stub, _| {
        let search = query.search.as_deref().map(str::to_lowercase);
        let mut products: Vec<Product> = stub
            .catalog
            .iter()
            .filter(|entry| {
                query
                    .category_slug
                    .as_deref()
                    .is_none_or(|slug| entry.category == slug)
            })
            .filter(|entry| {
                search
                    .as_deref()
                    .is_none_or(|term| entry.product.name.to_lowercase().contains(term))
            })
            .filter(|entry| query.featured.is_none_or(|f| entry.product.is_featured == f))
            .map(|entry| entry.product.clone())
            .collect();

        match query.sort_by {
            Some(SortBy::Price) => products.sort_by_key(|p| p.price),
            Some(SortBy::Name) => products.sort_by(|a, b| a.name.cmp(&b.name)),
            Some(SortBy::CreatedAt | SortBy::SortOrder) | None => products.sort_by_key(|p| p.id),
        }
        if query.sort_order == Some(SortOrder::Desc) {
            products.reverse();
        }

        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(12).max(1);
        let total = products.len();
        let total_pages = u32::try_from(total.div_ceil(page_size as usize)).unwrap();
        let items = products
            .into_iter()
            .skip((page as usize - 1) * page_size as usize)
            .take(page_size as usize)
            .collect();

        ok(&ProductPage {
            items,
            total: total as u64,
            page,
            page_size,
            total_pages,
        })
    })
    .await
}

#[derive(Deserialize)]
struct FeaturedParams {
    limit: Option<usize>,
}

async fn featured_products(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<FeaturedParams>,
) -> Response {
    respond(
        &state,
        "GET",
        "/products/featured".to_string(),
        &headers,
        |stub, _| {
            let products: Vec<Product> = stub
                .catalog
                .iter()
                .filter(|entry| entry.product.is_featured)
                .take(params.limit.unwrap_or(8))
                .map(|entry| entry.product.clone())
                .collect();
            ok(&products)
        },
    )
    .await
}

async fn get_product(
    State(state): State<Shared>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(&state, "GET", format!("/products/{slug}"), &headers, |stub, _| {
        stub.catalog
            .iter()
            .find(|entry| entry.product.slug == slug)
            .map(|entry| Json(entry.product.clone()).into_response())
            .ok_or_else(|| StubError::new(StatusCode::NOT_FOUND, "Producto no encontrado"))
    })
    .await
}

async fn categories(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/categories".to_string(), &headers, |_, _| {
        let category = |id: i64, name: &str, slug: &str, sort_order: i32| Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            image_url: None,
            sort_order,
        };
        ok(&vec![
            category(2, "Kuchen", "kuchen", 2),
            category(1, "Tortas", "tortas", 1),
        ])
    })
    .await
}

async fn home_covers(State(state): State<Shared>, headers: HeaderMap) -> Response {
    respond(&state, "GET", "/home-covers".to_string(), &headers, |_, _| {
        ok(&vec![HomeCover {
            id: HomeCoverId::new(1),
            image_url: "/uploads/covers/hero.jpg".to_string(),
            alt_text: Some("Vitrina de tortas".to_string()),
            sort_order: 0,
        }])
    })
    .await
}
