//! Integration tests for the Kiosk cart engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kiosk-integration-tests
//! ```
//!
//! Tests drive the real `CommerceClient` against [`MockCommerce`], an
//! in-process axum server on an ephemeral port that speaks the commerce API's
//! envelope format. The mock counts calls per route so tests can assert that
//! locally rejected input never reaches the network.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use kiosk_storefront::ShopperSession;
use kiosk_storefront::config::StorefrontConfig;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Bearer token the mock accepts.
pub const TEST_TOKEN: &str = "kiosk-test-4f9a2c71";

/// Route names used for call counting.
pub mod route {
    pub const FETCH_CART: &str = "GET /cart";
    pub const CLEAR_CART: &str = "DELETE /cart";
    pub const ADD_TO_CART: &str = "POST /cart/add-to-cart";
    pub const UPDATE_ITEM: &str = "PATCH /cart/item";
    pub const REMOVE_ITEM: &str = "DELETE /cart/item";
    pub const APPLY_COUPON: &str = "POST /cart/coupon";
    pub const CONFIRM_PAYMENT: &str = "POST /payment/confirm";
    pub const FETCH_PRODUCT: &str = "GET /products";
}

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
struct MockState {
    catalog: Mutex<HashMap<String, Value>>,
    lines: Mutex<Vec<(String, u32)>>,
    coupon: Mutex<Option<Value>>,
    coupons: Mutex<HashMap<String, i64>>,
    confirmations: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<Vec<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockState {
    /// Count the call, check auth, apply injected delay and failure.
    async fn enter(
        &self,
        route: &'static str,
        headers: &HeaderMap,
    ) -> Result<InFlight<'_>, Reply> {
        *self.calls.lock().await.entry(route).or_default() += 1;

        let expected = format!("Bearer {TEST_TOKEN}");
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected);
        if !authorized {
            return Err(rejected(StatusCode::UNAUTHORIZED, "Not logged in"));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let delay = self.delays.lock().await.get(route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().await.contains(&route) {
            return Err(rejected(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"));
        }
        Ok(guard)
    }

    async fn cart_json(&self) -> Value {
        let catalog = self.catalog.lock().await;
        let lines = self.lines.lock().await;
        let items: Vec<Value> = lines
            .iter()
            .map(|(product_id, quantity)| {
                json!({
                    "id": format!("ci-{product_id}"),
                    "productId": product_id,
                    "quantity": quantity,
                    "product": catalog.get(product_id).cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        let shop_id = lines
            .first()
            .and_then(|(product_id, _)| catalog.get(product_id))
            .and_then(|product| product.get("shopId").cloned());
        json!({
            "items": items,
            "shopId": shop_id,
            "coupon": self.coupon.lock().await.clone(),
        })
    }
}

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn rejected(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "message": message })))
}

/// Product JSON as served by `GET /products/{id}`.
#[must_use]
pub fn product_json(id: &str, shop: &str, base_price: i64, stock: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "image": format!("https://cdn.kiosk.test/{id}.jpg"),
        "basePrice": base_price,
        "stock": stock,
        "shopId": shop,
    })
}

// =============================================================================
// Handlers
// =============================================================================

async fn fetch_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    let _in_flight = match state.enter(route::FETCH_CART, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    ok(state.cart_json().await)
}

async fn clear_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Reply {
    let _in_flight = match state.enter(route::CLEAR_CART, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    state.lines.lock().await.clear();
    *state.coupon.lock().await = None;
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn add_to_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let _in_flight = match state.enter(route::ADD_TO_CART, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let product_id = body["productId"].as_str().unwrap_or_default().to_string();
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or(0)).unwrap_or(0);

    let Some(product) = state.catalog.lock().await.get(&product_id).cloned() else {
        return rejected(StatusCode::NOT_FOUND, "Product not found");
    };
    let stock = u32::try_from(product["stock"].as_u64().unwrap_or(0)).unwrap_or(0);
    let shop = product["shopId"].clone();

    {
        let catalog = state.catalog.lock().await;
        let mut lines = state.lines.lock().await;
        let other_shop = lines
            .first()
            .and_then(|(id, _)| catalog.get(id))
            .is_some_and(|first| first["shopId"] != shop);
        if other_shop {
            return rejected(StatusCode::CONFLICT, "Cart contains items from another shop");
        }
        let existing = lines
            .iter()
            .find(|(id, _)| *id == product_id)
            .map_or(0, |(_, q)| *q);
        if existing + quantity > stock {
            return rejected(StatusCode::OK, "Insufficient stock");
        }
        if let Some(line) = lines.iter_mut().find(|(id, _)| *id == product_id) {
            line.1 += quantity;
        } else {
            lines.push((product_id, quantity));
        }
    }
    ok(state.cart_json().await)
}

async fn update_item(
    State(state): State<Arc<MockState>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let _in_flight = match state.enter(route::UPDATE_ITEM, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let quantity = u32::try_from(body["quantity"].as_u64().unwrap_or(0)).unwrap_or(0);
    {
        let mut lines = state.lines.lock().await;
        let Some(line) = lines.iter_mut().find(|(id, _)| *id == product_id) else {
            return rejected(StatusCode::NOT_FOUND, "Item not in cart");
        };
        line.1 = quantity;
    }
    ok(state.cart_json().await)
}

async fn remove_item(
    State(state): State<Arc<MockState>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let _in_flight = match state.enter(route::REMOVE_ITEM, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let mut lines = state.lines.lock().await;
    lines.retain(|(id, _)| *id != product_id);
    if lines.is_empty() {
        *state.coupon.lock().await = None;
    }
    ok(json!({ "productId": product_id }))
}

async fn apply_coupon(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let _in_flight = match state.enter(route::APPLY_COUPON, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let code = body["code"].as_str().unwrap_or_default().to_string();
    let Some(discount) = state.coupons.lock().await.get(&code).copied() else {
        return rejected(StatusCode::BAD_REQUEST, "Coupon has expired");
    };
    let coupon = json!({
        "code": code,
        "message": format!("{code} applied"),
        "discountAmount": discount,
    });
    *state.coupon.lock().await = Some(coupon.clone());
    ok(coupon)
}

async fn confirm_payment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let _in_flight = match state.enter(route::CONFIRM_PAYMENT, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    let reference = body["paymentReference"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    *state
        .confirmations
        .lock()
        .await
        .entry(reference.clone())
        .or_default() += 1;
    ok(json!({ "orderId": format!("order-{reference}") }))
}

async fn fetch_product(
    State(state): State<Arc<MockState>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let _in_flight = match state.enter(route::FETCH_PRODUCT, &headers).await {
        Ok(guard) => guard,
        Err(reply) => return reply,
    };
    match state.catalog.lock().await.get(&product_id) {
        Some(product) => ok(product.clone()),
        None => rejected(StatusCode::NOT_FOUND, "Product not found"),
    }
}

// =============================================================================
// MockCommerce
// =============================================================================

/// In-process commerce API.
pub struct MockCommerce {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockCommerce {
    /// Start the mock on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let api = Router::new()
            .route("/cart", get(fetch_cart).delete(clear_cart))
            .route("/cart/add-to-cart", post(add_to_cart))
            .route("/cart/item/{product_id}", patch(update_item).delete(remove_item))
            .route("/cart/coupon", post(apply_coupon))
            .route("/payment/confirm", post(confirm_payment))
            .route("/products/{product_id}", get(fetch_product))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock commerce API");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Session whose client points at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the config or client cannot be built.
    #[must_use]
    pub fn session(&self) -> ShopperSession {
        self.session_with_token(TEST_TOKEN)
    }

    /// Session authenticating with `token`.
    ///
    /// # Panics
    ///
    /// Panics if the config or client cannot be built.
    #[must_use]
    pub fn session_with_token(&self, token: &str) -> ShopperSession {
        let mut config =
            StorefrontConfig::for_base_url(&self.base_url(), SecretString::from(token.to_string()))
                .expect("Failed to build config");
        config.payment_redirect_delay = Duration::from_millis(20);
        ShopperSession::start(config).expect("Failed to build commerce client")
    }

    pub async fn stock(&self, product: Value) {
        let id = product["id"].as_str().unwrap_or_default().to_string();
        self.state.catalog.lock().await.insert(id, product);
    }

    /// Change stock of a catalog product behind the client's back.
    pub async fn set_stock(&self, product_id: &str, stock: u32) {
        if let Some(product) = self.state.catalog.lock().await.get_mut(product_id) {
            product["stock"] = json!(stock);
        }
    }

    pub async fn offer_coupon(&self, code: &str, discount: i64) {
        self.state
            .coupons
            .lock()
            .await
            .insert(code.to_string(), discount);
    }

    pub async fn fail(&self, route: &'static str) {
        self.state.failing.lock().await.push(route);
    }

    pub async fn delay(&self, route: &'static str, delay: Duration) {
        self.state.delays.lock().await.insert(route, delay);
    }

    pub async fn calls(&self, route: &str) -> usize {
        self.state.calls.lock().await.get(route).copied().unwrap_or(0)
    }

    pub async fn total_calls(&self) -> usize {
        self.state.calls.lock().await.values().sum()
    }

    pub async fn confirmations(&self, reference: &str) -> usize {
        self.state
            .confirmations
            .lock()
            .await
            .get(reference)
            .copied()
            .unwrap_or(0)
    }

    /// Number of remote cart lines.
    pub async fn remote_lines(&self) -> usize {
        self.state.lines.lock().await.len()
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for MockCommerce {
    fn drop(&mut self) {
        self.server.abort();
    }
}
