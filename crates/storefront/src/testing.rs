//! In-memory `CommerceApi` for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kiosk_core::{
    CartItemId, PaymentReference, PaymentStatus, PricingInfo, Product, ProductId, ProductSnapshot,
    ShopId,
};
use rust_decimal::Decimal;

use crate::cart::{CartContents, CartItem, Coupon, RemoteCart};
use crate::commerce::{ApiError, CommerceApi, Freshness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchCart,
    AddToCart,
    UpdateQuantity,
    RemoveItem,
    ClearCart,
    ApplyCoupon,
    ConfirmPayment,
    FetchProduct,
}

impl Op {
    fn failure(self) -> ApiError {
        match self {
            Self::AddToCart => ApiError::Rejected("Out of stock".to_string()),
            Self::ApplyCoupon => ApiError::Rejected("Coupon has expired".to_string()),
            Self::ClearCart => ApiError::MissingData("acknowledgement"),
            Self::FetchCart | Self::FetchProduct => ApiError::Status {
                status: 500,
                message: Some("internal error".to_string()),
            },
            _ => ApiError::Status {
                status: 503,
                message: Some("service unavailable".to_string()),
            },
        }
    }
}

pub fn product(id: &str, shop: &str, price: Decimal, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        snapshot: ProductSnapshot {
            name: format!("Product {id}"),
            image: None,
            pricing: PricingInfo::regular(price),
            stock,
            shop_id: ShopId::new(shop),
        },
    }
}

/// Fake remote cart with call counters and injectable failures and delays.
pub struct FakeApi {
    catalog: Mutex<HashMap<ProductId, Product>>,
    items: Mutex<Vec<CartItem>>,
    coupon: Mutex<Option<Coupon>>,
    discount: Mutex<Decimal>,
    failing: Mutex<HashSet<Op>>,
    delays: Mutex<HashMap<Op, Duration>>,
    calls: Mutex<HashMap<Op, usize>>,
    confirmed: Mutex<Vec<(PaymentReference, PaymentStatus)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            catalog: Mutex::default(),
            items: Mutex::default(),
            coupon: Mutex::default(),
            discount: Mutex::new(Decimal::TEN),
            failing: Mutex::default(),
            delays: Mutex::default(),
            calls: Mutex::default(),
            confirmed: Mutex::default(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeApi {
    pub fn stock(&self, product: Product) {
        self.catalog
            .lock()
            .unwrap()
            .insert(product.id.clone(), product);
    }

    pub fn seed_cart(&self, items: Vec<CartItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn coupon_discount(&self, discount: Decimal) {
        *self.discount.lock().unwrap() = discount;
    }

    pub fn fail_on(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn delay_on(&self, op: Op, delay: Duration) {
        self.delays.lock().unwrap().insert(op, delay);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn confirmed(&self) -> Vec<(PaymentReference, PaymentStatus)> {
        self.confirmed.lock().unwrap().clone()
    }

    async fn enter(&self, op: Op) -> Result<InFlight<'_>, ApiError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let delay = self.delays.lock().unwrap().get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&op) {
            return Err(op.failure());
        }
        Ok(guard)
    }

    fn contents(&self) -> Result<CartContents, ApiError> {
        let items = self.items.lock().unwrap().clone();
        CartContents::new(items, None).map_err(|e| ApiError::InvalidData(e.to_string()))
    }

    fn catalog_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        self.catalog
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: Some(format!("Product {product_id} not found")),
            })
    }
}

impl CommerceApi for FakeApi {
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError> {
        let _in_flight = self.enter(Op::FetchCart).await?;
        Ok(RemoteCart {
            contents: self.contents()?,
            coupon: self.coupon.lock().unwrap().clone(),
        })
    }

    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartContents, ApiError> {
        let _in_flight = self.enter(Op::AddToCart).await?;
        let product = self.catalog_product(product_id)?;
        {
            let mut items = self.items.lock().unwrap();
            if let Some(line) = items.iter_mut().find(|i| &i.product_id == product_id) {
                line.quantity += quantity;
            } else {
                items.push(CartItem {
                    id: CartItemId::new(format!("ci-{product_id}")),
                    product_id: product_id.clone(),
                    quantity,
                    product: product.snapshot,
                });
            }
        }
        self.contents()
    }

    async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartContents, ApiError> {
        let _in_flight = self.enter(Op::UpdateQuantity).await?;
        {
            let mut items = self.items.lock().unwrap();
            if let Some(line) = items.iter_mut().find(|i| &i.product_id == product_id) {
                line.quantity = quantity;
            }
        }
        self.contents()
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<ProductId, ApiError> {
        let _in_flight = self.enter(Op::RemoveItem).await?;
        let mut items = self.items.lock().unwrap();
        items.retain(|i| &i.product_id != product_id);
        if items.is_empty() {
            *self.coupon.lock().unwrap() = None;
        }
        Ok(product_id.clone())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let _in_flight = self.enter(Op::ClearCart).await?;
        self.items.lock().unwrap().clear();
        *self.coupon.lock().unwrap() = None;
        Ok(())
    }

    async fn apply_coupon(&self, code: &str) -> Result<Coupon, ApiError> {
        let _in_flight = self.enter(Op::ApplyCoupon).await?;
        let coupon = Coupon {
            code: code.to_string(),
            message: format!("{code} applied"),
            discount: *self.discount.lock().unwrap(),
        };
        *self.coupon.lock().unwrap() = Some(coupon.clone());
        Ok(coupon)
    }

    async fn confirm_payment(
        &self,
        reference: &PaymentReference,
        status: PaymentStatus,
    ) -> Result<(), ApiError> {
        let _in_flight = self.enter(Op::ConfirmPayment).await?;
        self.confirmed
            .lock()
            .unwrap()
            .push((reference.clone(), status));
        Ok(())
    }

    async fn fetch_product(
        &self,
        product_id: &ProductId,
        _freshness: Freshness,
    ) -> Result<Product, ApiError> {
        let _in_flight = self.enter(Op::FetchProduct).await?;
        self.catalog_product(product_id)
    }
}
