//! Cart domain types.

use chrono::{DateTime, Utc};
use kiosk_core::{CartItemId, EffectivePrice, ProductId, ProductSnapshot, ShopId, resolve_price};
use rust_decimal::Decimal;
use serde::Serialize;

/// One cart line with its denormalized product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartItem {
    /// Effective unit price at `now`.
    #[must_use]
    pub fn unit_price(&self, now: DateTime<Utc>) -> EffectivePrice {
        resolve_price(&self.product.pricing, now)
    }

    /// Effective line amount at `now`.
    #[must_use]
    pub fn line_total(&self, now: DateTime<Utc>) -> Decimal {
        self.unit_price(now).line_total(self.quantity)
    }
}

/// Items plus the shop they all belong to.
///
/// Constructed only through [`CartContents::new`], which enforces the
/// shop-exclusivity invariant: a non-empty cart has exactly one shop and every
/// item belongs to it; an empty cart has no shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartContents {
    items: Vec<CartItem>,
    shop_id: Option<ShopId>,
}

/// Items from more than one shop were offered as one cart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cart mixes items from shop {expected} and shop {found}")]
pub struct MixedShops {
    pub expected: ShopId,
    pub found: ShopId,
}

impl CartContents {
    /// Build contents, deriving the shop marker from the items.
    ///
    /// `declared_shop`, when given, must agree with every item.
    ///
    /// # Errors
    ///
    /// Returns [`MixedShops`] if two items (or an item and the declared shop)
    /// disagree.
    pub fn new(items: Vec<CartItem>, declared_shop: Option<ShopId>) -> Result<Self, MixedShops> {
        let Some(first) = items.first() else {
            return Ok(Self::default());
        };
        let shop = declared_shop.unwrap_or_else(|| first.product.shop_id.clone());
        if let Some(stray) = items.iter().find(|item| item.product.shop_id != shop) {
            return Err(MixedShops {
                expected: shop,
                found: stray.product.shop_id.clone(),
            });
        }
        Ok(Self {
            items,
            shop_id: Some(shop),
        })
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub const fn shop_id(&self) -> Option<&ShopId> {
        self.shop_id.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop the line for `product_id`; clears the shop marker when the cart
    /// becomes empty.
    pub(crate) fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|item| &item.product_id != product_id);
        if self.items.is_empty() {
            self.shop_id = None;
        }
    }
}

/// A discount code priced by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coupon {
    pub code: String,
    pub message: String,
    pub discount: Decimal,
}

/// Full remote cart as returned by `GET /cart`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCart {
    pub contents: CartContents,
    pub coupon: Option<Coupon>,
}

/// Derived monetary totals. `final_amount` is never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub original: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
}

impl CartTotals {
    /// Totals for `original` less `discount`, clamped at zero.
    #[must_use]
    pub fn new(original: Decimal, discount: Decimal) -> Self {
        Self {
            original,
            discount,
            final_amount: (original - discount).max(Decimal::ZERO),
        }
    }

    /// Compute totals for `items` with an optional coupon at `now`.
    #[must_use]
    pub fn compute(items: &[CartItem], coupon: Option<&Coupon>, now: DateTime<Utc>) -> Self {
        let original = items.iter().map(|item| item.line_total(now)).sum();
        let discount = coupon.map_or(Decimal::ZERO, |c| c.discount);
        Self::new(original, discount)
    }
}

/// Request status of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

/// Read-only view of the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub contents: CartContents,
    pub coupon: Option<Coupon>,
    pub totals: CartTotals,
    pub status: CartStatus,
}

impl Cart {
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.contents.items()
    }

    #[must_use]
    pub const fn shop_id(&self) -> Option<&ShopId> {
        self.contents.shop_id()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items().iter().map(|item| item.quantity).sum()
    }

    /// Line for `product_id`, if present.
    #[must_use]
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items().iter().find(|item| &item.product_id == product_id)
    }
}
