//! Client-side cart snapshot.
//!
//! The store is the single holder of cart state for a shopper session. It is
//! written only through [`CartStore::apply`] (after a confirmed remote
//! mutation) and [`CartStore::reset`]. Every write bumps a version; `apply`
//! carries the version its mutation started from and is refused when the
//! store moved on in the meantime, so a response resolving after a logout
//! cannot resurrect the old cart.

use std::sync::Arc;

use kiosk_core::{Clock, ProductId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::model::{Cart, CartContents, CartStatus, CartTotals, Coupon};

/// Monotonic version of the store's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CartVersion(u64);

impl CartVersion {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A write was attempted from an outdated version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cart changed while the request was in flight (expected version {}, found {})", .expected.get(), .found.get())]
pub struct StaleSnapshot {
    pub expected: CartVersion,
    pub found: CartVersion,
}

/// Outcome of a confirmed remote operation, ready to be written.
#[derive(Debug, Clone)]
pub enum SnapshotDelta {
    /// Replace everything, including the coupon (`GET /cart`).
    Replace {
        contents: CartContents,
        coupon: Option<Coupon>,
    },
    /// New items and shop marker after an add or quantity update.
    Contents(CartContents),
    /// One line was removed.
    Removed(ProductId),
    /// A coupon was accepted.
    Coupon(Coupon),
}

struct StoreState {
    cart: Cart,
    version: CartVersion,
}

/// Holder of the cart snapshot.
pub struct CartStore {
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: RwLock::new(StoreState {
                cart: Cart::default(),
                version: CartVersion(0),
            }),
        }
    }

    /// Copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.state.read().await.cart.clone()
    }

    /// Copy of the current cart with its version.
    pub async fn read(&self) -> (Cart, CartVersion) {
        let state = self.state.read().await;
        (state.cart.clone(), state.version)
    }

    /// Current version.
    pub async fn version(&self) -> CartVersion {
        self.state.read().await.version
    }

    /// Write the result of a confirmed remote operation.
    ///
    /// Totals are recomputed from the new items and coupon. A cart that ends
    /// up empty loses its coupon and shop marker.
    ///
    /// # Errors
    ///
    /// Returns [`StaleSnapshot`] if the store is no longer at `base`; nothing
    /// is written in that case.
    pub async fn apply(
        &self,
        delta: SnapshotDelta,
        base: CartVersion,
    ) -> Result<CartVersion, StaleSnapshot> {
        let mut state = self.state.write().await;
        if state.version != base {
            return Err(StaleSnapshot {
                expected: base,
                found: state.version,
            });
        }

        let cart = &mut state.cart;
        match delta {
            SnapshotDelta::Replace { contents, coupon } => {
                cart.contents = contents;
                cart.coupon = coupon;
            }
            SnapshotDelta::Contents(contents) => cart.contents = contents,
            SnapshotDelta::Removed(product_id) => cart.contents.remove(&product_id),
            SnapshotDelta::Coupon(coupon) => cart.coupon = Some(coupon),
        }
        if cart.contents.is_empty() {
            cart.coupon = None;
        }
        cart.totals = CartTotals::compute(cart.items(), cart.coupon.as_ref(), self.clock.now());
        cart.status = CartStatus::Idle;

        state.version = state.version.next();
        debug!(version = state.version.get(), "cart snapshot applied");
        Ok(state.version)
    }

    /// Clear to the empty cart (no items, shop, or coupon).
    pub async fn reset(&self) -> CartVersion {
        let mut state = self.state.write().await;
        state.cart = Cart::default();
        state.version = state.version.next();
        debug!(version = state.version.get(), "cart reset");
        state.version
    }

    /// Record request status without touching the snapshot or its version.
    pub async fn set_status(&self, status: CartStatus) {
        self.state.write().await.cart.status = status;
    }

    /// Put back a status read at `base`, unless the cart has moved on.
    pub async fn restore_status(&self, status: CartStatus, base: CartVersion) {
        let mut state = self.state.write().await;
        if state.version == base {
            state.cart.status = status;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::model::tests::item;
    use kiosk_core::SystemClock;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn store() -> CartStore {
        CartStore::new(Arc::new(SystemClock))
    }

    fn contents(items: Vec<crate::cart::CartItem>) -> CartContents {
        CartContents::new(items, None).unwrap()
    }

    fn coupon(discount: Decimal) -> Coupon {
        Coupon {
            code: "SAVE".to_string(),
            message: "Saved".to_string(),
            discount,
        }
    }

    #[tokio::test]
    async fn test_apply_recomputes_totals() {
        let store = store();
        let base = store.version().await;
        store
            .apply(
                SnapshotDelta::Contents(contents(vec![item("p-1", "shop-a", dec!(100), 3)])),
                base,
            )
            .await
            .unwrap();

        let cart = store.snapshot().await;
        assert_eq!(cart.totals.original, dec!(300));
        assert_eq!(cart.totals.final_amount, dec!(300));
        assert_eq!(cart.shop_id().map(|s| s.as_str()), Some("shop-a"));
    }

    #[tokio::test]
    async fn test_stale_apply_is_rejected_and_writes_nothing() {
        let store = store();
        let stale = store.version().await;
        store.reset().await;

        let err = store
            .apply(
                SnapshotDelta::Contents(contents(vec![item("p-1", "shop-a", dec!(100), 1)])),
                stale,
            )
            .await
            .unwrap_err();

        assert_eq!(err.expected, stale);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_coupon_applied_then_cart_emptied_drops_coupon() {
        let store = store();
        let v = store.version().await;
        let v = store
            .apply(
                SnapshotDelta::Contents(contents(vec![item("p-1", "shop-a", dec!(100), 1)])),
                v,
            )
            .await
            .unwrap();
        let v = store
            .apply(SnapshotDelta::Coupon(coupon(dec!(30))), v)
            .await
            .unwrap();
        assert_eq!(store.snapshot().await.totals.final_amount, dec!(70));

        store
            .apply(SnapshotDelta::Removed(ProductId::new("p-1")), v)
            .await
            .unwrap();

        let cart = store.snapshot().await;
        assert!(cart.is_empty());
        assert!(cart.coupon.is_none());
        assert!(cart.shop_id().is_none());
        assert_eq!(cart.totals, CartTotals::default());
    }

    #[tokio::test]
    async fn test_coupon_larger_than_cart_clamps_final_amount() {
        let store = store();
        let v = store.version().await;
        let v = store
            .apply(
                SnapshotDelta::Contents(contents(vec![item("p-1", "shop-a", dec!(40), 1)])),
                v,
            )
            .await
            .unwrap();
        store
            .apply(SnapshotDelta::Coupon(coupon(dec!(100))), v)
            .await
            .unwrap();

        let totals = store.snapshot().await.totals;
        assert_eq!(totals.original, dec!(40));
        assert_eq!(totals.discount, dec!(100));
        assert_eq!(totals.final_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_reset_clears_coupon_and_bumps_version() {
        let store = store();
        let v = store.version().await;
        let v = store
            .apply(
                SnapshotDelta::Contents(contents(vec![item("p-1", "shop-a", dec!(100), 1)])),
                v,
            )
            .await
            .unwrap();
        let v = store
            .apply(SnapshotDelta::Coupon(coupon(dec!(10))), v)
            .await
            .unwrap();

        let after = store.reset().await;
        assert!(after > v);

        let cart = store.snapshot().await;
        assert!(cart.is_empty());
        assert!(cart.coupon.is_none());
    }

    #[tokio::test]
    async fn test_set_status_keeps_version() {
        let store = store();
        let before = store.version().await;
        store.set_status(CartStatus::Loading).await;
        assert_eq!(store.version().await, before);
        assert_eq!(store.snapshot().await.status, CartStatus::Loading);
    }

    #[tokio::test]
    async fn test_restore_status_skipped_after_reset() {
        let store = store();
        let base = store.version().await;
        store.set_status(CartStatus::Loading).await;

        store
            .restore_status(CartStatus::Error("Coupon has expired".to_string()), base)
            .await;
        assert_eq!(
            store.snapshot().await.status,
            CartStatus::Error("Coupon has expired".to_string())
        );

        store.reset().await;
        store.restore_status(CartStatus::Loading, base).await;
        assert_eq!(store.snapshot().await.status, CartStatus::default());
    }
}
