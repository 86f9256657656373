//! Cart mutation flows.
//!
//! Every mutation goes through the same sequence: validate locally, take the
//! per-cart gate, call the remote service, then write the confirmed result to
//! the [`CartStore`]. The gate is a fair `tokio::sync::Mutex`, so concurrent
//! mutations run one at a time in arrival order. `reset` does not take the
//! gate; it bumps the store version, so any in-flight write fails with
//! [`StaleSnapshot`](super::StaleSnapshot) instead of resurrecting the cart.

use std::sync::Arc;

use kiosk_core::{ProductId, ShopId};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::model::{Cart, CartStatus};
use super::store::{CartStore, CartVersion, SnapshotDelta};
use crate::commerce::{CommerceApi, Freshness};
use crate::error::{CartError, Result, ValidationError, add_breadcrumb, report};

/// Request to add a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Shop the shopper believes sells the product. Re-checked against the
    /// catalog before anything is written.
    pub shop_id: ShopId,
}

/// Pending decision to empty a cart from one shop and add an item from
/// another.
///
/// Pass it to [`CartService::confirm_shop_switch`] to proceed. Dropping it
/// leaves the cart untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "dropping a shop switch leaves the cart untouched"]
pub struct ShopSwitch {
    current_shop: ShopId,
    request: AddItem,
}

impl ShopSwitch {
    /// Shop the cart currently belongs to.
    #[must_use]
    pub const fn current_shop(&self) -> &ShopId {
        &self.current_shop
    }

    /// Shop of the product being added.
    #[must_use]
    pub const fn requested_shop(&self) -> &ShopId {
        &self.request.shop_id
    }

    /// The add that will run once confirmed.
    #[must_use]
    pub const fn request(&self) -> &AddItem {
        &self.request
    }
}

/// Result of [`CartService::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Item added; carries the updated cart.
    Added(Cart),
    /// The cart holds another shop's items. Nothing was changed.
    NeedsShopSwitch(ShopSwitch),
}

/// Serializes and applies cart mutations for one shopper.
pub struct CartService<A> {
    pub(super) api: A,
    pub(super) store: Arc<CartStore>,
    pub(super) gate: Mutex<()>,
}

impl<A> std::fmt::Debug for CartService<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<A: CommerceApi> CartService<A> {
    #[must_use]
    pub fn new(api: A, store: Arc<CartStore>) -> Self {
        Self {
            api,
            store,
            gate: Mutex::new(()),
        }
    }

    /// The commerce API this service talks to.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &Arc<CartStore> {
        &self.store
    }

    /// Copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.store.snapshot().await
    }

    /// Replace the local snapshot with the remote cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Fetch` if the remote read fails; the previous
    /// snapshot is kept.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Cart> {
        let _guard = self.gate.lock().await;
        let version = self.store.version().await;
        self.store.set_status(CartStatus::Loading).await;

        let result: Result<Cart> = async {
            let remote = self.api.fetch_cart().await.map_err(CartError::Fetch)?;
            self.store
                .apply(
                    SnapshotDelta::Replace {
                        contents: remote.contents,
                        coupon: remote.coupon,
                    },
                    version,
                )
                .await?;
            Ok(self.store.snapshot().await)
        }
        .await;

        self.settle(result).await
    }

    /// Add `quantity` of a product.
    ///
    /// Returns [`AddOutcome::NeedsShopSwitch`] without any network call when
    /// the cart already holds items from a different shop.
    ///
    /// # Errors
    ///
    /// - `Validation` for a zero quantity or insufficient stock
    /// - `Fetch` if the catalog re-read fails
    /// - `CartMutation` if the remote add fails
    #[instrument(skip(self, request), fields(product_id = %request.product_id, shop_id = %request.shop_id))]
    pub async fn add_item(&self, request: AddItem) -> Result<AddOutcome> {
        if request.quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let _guard = self.gate.lock().await;
        let (cart, version) = self.store.read().await;

        if let Some(current) = conflicting_shop(&cart, &request.shop_id) {
            info!(current_shop = %current, "Add needs a shop switch");
            return Ok(AddOutcome::NeedsShopSwitch(ShopSwitch {
                current_shop: current.clone(),
                request,
            }));
        }

        let previous_status = cart.status.clone();
        self.store.set_status(CartStatus::Loading).await;
        let result: Result<AddOutcome> = async {
            let request = self.verify_add(&cart, request).await?;
            // The catalog may place the product in another shop.
            if let Some(current) = conflicting_shop(&cart, &request.shop_id) {
                info!(current_shop = %current, "Catalog shop needs a shop switch");
                self.store.restore_status(previous_status, version).await;
                return Ok(AddOutcome::NeedsShopSwitch(ShopSwitch {
                    current_shop: current.clone(),
                    request,
                }));
            }
            self.commit_add(version, request).await
        }
        .await;
        self.settle(result).await
    }

    /// Empty the cart (remote and local) and run the pending add.
    ///
    /// The product and its stock are re-checked before anything is cleared,
    /// so a switch that cannot succeed leaves the current cart in place. If
    /// the remote add fails after the clear, the cart stays empty.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::add_item`], plus `CartMutation` if the clear
    /// fails (in which case nothing changed).
    #[instrument(skip(self, switch), fields(from = %switch.current_shop, to = %switch.request.shop_id))]
    pub async fn confirm_shop_switch(&self, switch: ShopSwitch) -> Result<AddOutcome> {
        let _guard = self.gate.lock().await;
        self.store.set_status(CartStatus::Loading).await;

        let result: Result<AddOutcome> = async {
            // Checked against the empty cart the switch leaves behind.
            let request = self.verify_add(&Cart::default(), switch.request).await?;
            self.api
                .clear_cart()
                .await
                .map_err(CartError::CartMutation)?;
            let version = self.store.reset().await;
            add_breadcrumb(
                "cart",
                "Switched shop",
                Some(&[("shop_id", request.shop_id.as_str())]),
            );
            self.commit_add(version, request).await
        }
        .await;

        self.settle(result).await
    }

    /// Set the quantity of an item already in the cart.
    ///
    /// # Errors
    ///
    /// - `Validation` if the item is not in the cart or `quantity` is outside
    ///   `1..=stock`; no network call is made
    /// - `CartMutation` if the remote update fails
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<Cart> {
        let _guard = self.gate.lock().await;
        let (cart, version) = self.store.read().await;

        let item = cart
            .item(product_id)
            .ok_or_else(|| ValidationError::ItemNotInCart(product_id.clone()))?;
        let stock = item.product.stock;
        if quantity == 0 || quantity > stock {
            return Err(ValidationError::QuantityOutOfRange {
                requested: quantity,
                stock,
            }
            .into());
        }

        self.store.set_status(CartStatus::Loading).await;
        let result: Result<Cart> = async {
            let contents = self
                .api
                .update_quantity(product_id, quantity)
                .await
                .map_err(CartError::CartMutation)?;
            self.store
                .apply(SnapshotDelta::Contents(contents), version)
                .await?;
            Ok(self.store.snapshot().await)
        }
        .await;

        self.settle(result).await
    }

    /// Remove one line from the cart.
    ///
    /// # Errors
    ///
    /// - `Validation` if the item is not in the cart
    /// - `CartMutation` if the remote remove fails
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<Cart> {
        let _guard = self.gate.lock().await;
        let (cart, version) = self.store.read().await;

        if cart.item(product_id).is_none() {
            return Err(ValidationError::ItemNotInCart(product_id.clone()).into());
        }

        self.store.set_status(CartStatus::Loading).await;
        let result: Result<Cart> = async {
            let removed = self
                .api
                .remove_item(product_id)
                .await
                .map_err(CartError::CartMutation)?;
            self.store
                .apply(SnapshotDelta::Removed(removed), version)
                .await?;
            add_breadcrumb(
                "cart",
                "Removed item",
                Some(&[("product_id", product_id.as_str())]),
            );
            Ok(self.store.snapshot().await)
        }
        .await;

        self.settle(result).await
    }

    /// Empty the cart remotely, then locally.
    ///
    /// # Errors
    ///
    /// Returns `CartMutation` if the remote clear fails; the local cart is
    /// kept in that case.
    pub async fn clear(&self) -> Result<Cart> {
        self.clear_unreported().await.inspect_err(report)
    }

    /// [`CartService::clear`] for callers that report the failure themselves.
    #[instrument(skip(self))]
    pub(crate) async fn clear_unreported(&self) -> Result<Cart> {
        let _guard = self.gate.lock().await;
        self.store.set_status(CartStatus::Loading).await;

        let result: Result<Cart> = async {
            self.api
                .clear_cart()
                .await
                .map_err(CartError::CartMutation)?;
            self.store.reset().await;
            add_breadcrumb("cart", "Cleared cart", None);
            Ok(self.store.snapshot().await)
        }
        .await;

        self.record_status(result).await
    }

    /// Drop local state without touching the remote cart (logout).
    pub async fn reset(&self) -> CartVersion {
        self.store.reset().await
    }

    /// Re-read the product, bypassing the cache, and check the add against
    /// it. The returned request carries the catalog's shop.
    async fn verify_add(&self, cart: &Cart, mut request: AddItem) -> Result<AddItem> {
        let product = self
            .api
            .fetch_product(&request.product_id, Freshness::Fresh)
            .await
            .map_err(CartError::Fetch)?;
        request.shop_id = product.snapshot.shop_id;

        let existing = cart.item(&request.product_id).map_or(0, |item| item.quantity);
        let requested = existing.saturating_add(request.quantity);
        if requested > product.snapshot.stock {
            return Err(ValidationError::InsufficientStock {
                requested,
                available: product.snapshot.stock,
            }
            .into());
        }
        Ok(request)
    }

    async fn commit_add(&self, version: CartVersion, request: AddItem) -> Result<AddOutcome> {
        let contents = self
            .api
            .add_to_cart(&request.product_id, request.quantity)
            .await
            .map_err(CartError::CartMutation)?;
        let version = self
            .store
            .apply(SnapshotDelta::Contents(contents), version)
            .await?;

        info!(version = version.get(), "Item added to cart");
        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", request.product_id.as_str())]),
        );
        Ok(AddOutcome::Added(self.store.snapshot().await))
    }

    /// Record the outcome of a network-backed step on the store status and
    /// report any failure.
    pub(super) async fn settle<T>(&self, result: Result<T>) -> Result<T> {
        self.record_status(result).await.inspect_err(report)
    }

    async fn record_status<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            // A stale write means the cart was reset underneath us; the reset
            // already left a clean status.
            if !matches!(err, CartError::StaleSnapshot(_)) {
                self.store
                    .set_status(CartStatus::Error(err.user_message()))
                    .await;
            }
        }
        result
    }
}

fn conflicting_shop<'a>(cart: &'a Cart, shop: &ShopId) -> Option<&'a ShopId> {
    cart.shop_id().filter(|current| *current != shop)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::model::tests::item;
    use crate::testing::{FakeApi, Op, product};
    use kiosk_core::SystemClock;
    use rust_decimal_macros::dec;

    fn service(api: FakeApi) -> CartService<FakeApi> {
        CartService::new(api, Arc::new(CartStore::new(Arc::new(SystemClock))))
    }

    fn add(product_id: &str, quantity: u32, shop: &str) -> AddItem {
        AddItem {
            product_id: ProductId::new(product_id),
            quantity,
            shop_id: ShopId::new(shop),
        }
    }

    async fn added(service: &CartService<FakeApi>, request: AddItem) -> Cart {
        match service.add_item(request).await.unwrap() {
            AddOutcome::Added(cart) => cart,
            AddOutcome::NeedsShopSwitch(switch) => panic!("unexpected shop switch: {switch:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_sets_shop_and_totals() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(1000), 5));
        let service = service(api);

        let cart = added(&service, add("p-1", 2, "shop-a")).await;

        assert_eq!(cart.shop_id().map(ShopId::as_str), Some("shop-a"));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.totals.final_amount, dec!(2000));
        assert_eq!(cart.status, CartStatus::Idle);
    }

    #[tokio::test]
    async fn test_add_from_other_shop_needs_switch_without_network() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.stock(product("p-2", "shop-b", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 1, "shop-a")).await;
        let calls_before = service.api().total_calls();

        let outcome = service.add_item(add("p-2", 1, "shop-b")).await.unwrap();

        let AddOutcome::NeedsShopSwitch(switch) = outcome else {
            panic!("expected a shop switch");
        };
        assert_eq!(switch.current_shop().as_str(), "shop-a");
        assert_eq!(switch.requested_shop().as_str(), "shop-b");
        assert_eq!(service.api().total_calls(), calls_before);
        assert_eq!(service.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_confirmed_switch_clears_then_adds() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.stock(product("p-2", "shop-b", dec!(300), 5));
        let service = service(api);
        added(&service, add("p-1", 1, "shop-a")).await;

        let AddOutcome::NeedsShopSwitch(switch) =
            service.add_item(add("p-2", 2, "shop-b")).await.unwrap()
        else {
            panic!("expected a shop switch");
        };
        let outcome = service.confirm_shop_switch(switch).await.unwrap();

        let AddOutcome::Added(cart) = outcome else {
            panic!("expected the item to be added");
        };
        assert_eq!(service.api().calls(Op::ClearCart), 1);
        assert_eq!(cart.shop_id().map(ShopId::as_str), Some("shop-b"));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.totals.original, dec!(600));
    }

    #[tokio::test]
    async fn test_switch_beyond_stock_keeps_current_cart() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.stock(product("p-2", "shop-b", dec!(300), 1));
        let service = service(api);
        let before = added(&service, add("p-1", 2, "shop-a")).await;

        let AddOutcome::NeedsShopSwitch(switch) =
            service.add_item(add("p-2", 3, "shop-b")).await.unwrap()
        else {
            panic!("expected a shop switch");
        };
        let err = service.confirm_shop_switch(switch).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::Validation(ValidationError::InsufficientStock {
                requested: 3,
                available: 1
            })
        ));
        assert_eq!(service.api().calls(Op::ClearCart), 0);
        let after = service.snapshot().await;
        assert_eq!(after.items(), before.items());
        assert_eq!(after.shop_id().map(ShopId::as_str), Some("shop-a"));
    }

    #[tokio::test]
    async fn test_catalog_shop_overrides_requested_shop() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.stock(product("p-2", "shop-b", dec!(100), 5));
        let service = service(api);
        added(&service, add("p-1", 1, "shop-a")).await;
        service.api().fail_on(Op::ApplyCoupon);
        service.apply_coupon("OLD").await.unwrap_err();
        let before = service.snapshot().await;
        assert!(matches!(before.status, CartStatus::Error(_)));

        // Caller claims shop-a, catalog says shop-b.
        let outcome = service.add_item(add("p-2", 1, "shop-a")).await.unwrap();

        let AddOutcome::NeedsShopSwitch(switch) = outcome else {
            panic!("expected a shop switch");
        };
        assert_eq!(switch.requested_shop().as_str(), "shop-b");
        assert_eq!(service.api().calls(Op::AddToCart), 1);
        assert_eq!(service.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_rejected_locally() {
        let service = service(FakeApi::default());
        let err = service.add_item(add("p-1", 0, "shop-a")).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::ZeroQuantity)
        ));
        assert_eq!(service.api().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_beyond_fresh_stock_is_rejected() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 3));
        let service = service(api);
        added(&service, add("p-1", 2, "shop-a")).await;

        let err = service.add_item(add("p-1", 2, "shop-a")).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::Validation(ValidationError::InsufficientStock {
                requested: 4,
                available: 3
            })
        ));
        assert_eq!(service.api().calls(Op::AddToCart), 1);
        assert_eq!(service.snapshot().await.item_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_cart_and_records_error() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.stock(product("p-2", "shop-a", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 1, "shop-a")).await;
        service.api().fail_on(Op::AddToCart);

        let err = service.add_item(add("p-2", 1, "shop-a")).await.unwrap_err();

        assert!(matches!(err, CartError::CartMutation(_)));
        let after = service.snapshot().await;
        assert_eq!(after.items(), before.items());
        assert!(matches!(after.status, CartStatus::Error(_)));
    }

    #[tokio::test]
    async fn test_update_quantity_out_of_range_makes_no_call() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        added(&service, add("p-1", 1, "shop-a")).await;
        let calls_before = service.api().total_calls();

        for quantity in [0, 6] {
            let err = service
                .update_quantity(&ProductId::new("p-1"), quantity)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CartError::Validation(ValidationError::QuantityOutOfRange { stock: 5, .. })
            ));
        }
        assert_eq!(service.api().total_calls(), calls_before);
    }

    #[tokio::test]
    async fn test_update_quantity_within_stock() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        added(&service, add("p-1", 1, "shop-a")).await;

        let cart = service
            .update_quantity(&ProductId::new("p-1"), 5)
            .await
            .unwrap();

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.totals.original, dec!(500));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_snapshot() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 1, "shop-a")).await;
        service.api().fail_on(Op::UpdateQuantity);

        let err = service
            .update_quantity(&ProductId::new("p-1"), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::CartMutation(_)));
        let after = service.snapshot().await;
        assert_eq!(after.items(), before.items());
        assert_eq!(after.totals, before.totals);
        assert!(matches!(after.status, CartStatus::Error(_)));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_rejected() {
        let service = service(FakeApi::default());
        let err = service
            .update_quantity(&ProductId::new("p-9"), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::ItemNotInCart(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_last_item_clears_shop() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        added(&service, add("p-1", 1, "shop-a")).await;

        let cart = service.remove_item(&ProductId::new("p-1")).await.unwrap();

        assert!(cart.is_empty());
        assert!(cart.shop_id().is_none());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_snapshot() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 2, "shop-a")).await;
        service.api().fail_on(Op::RemoveItem);

        let err = service.remove_item(&ProductId::new("p-1")).await.unwrap_err();

        assert!(matches!(err, CartError::CartMutation(_)));
        let after = service.snapshot().await;
        assert_eq!(after.items(), before.items());
        assert_eq!(after.shop_id().map(ShopId::as_str), Some("shop-a"));
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_cart() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 1, "shop-a")).await;
        service.api().fail_on(Op::ClearCart);

        let err = service.clear().await.unwrap_err();

        assert!(matches!(err, CartError::CartMutation(_)));
        assert_eq!(service.snapshot().await.items(), before.items());
    }

    #[tokio::test]
    async fn test_load_replaces_snapshot() {
        let api = FakeApi::default();
        api.seed_cart(vec![item("p-1", "shop-a", dec!(250), 2)]);
        let service = service(api);

        let cart = service.load().await.unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.totals.original, dec!(500));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_snapshot() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        let service = service(api);
        let before = added(&service, add("p-1", 1, "shop-a")).await;
        service.api().fail_on(Op::FetchCart);

        let err = service.load().await.unwrap_err();

        assert!(matches!(err, CartError::Fetch(_)));
        let after = service.snapshot().await;
        assert_eq!(after.items(), before.items());
        assert_eq!(after.totals, before.totals);
    }

    #[tokio::test]
    async fn test_reset_during_add_does_not_resurrect_cart() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 5));
        api.delay_on(Op::AddToCart, std::time::Duration::from_millis(50));
        let service = Arc::new(service(api));

        let adding = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.add_item(add("p-1", 1, "shop-a")).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        service.reset().await;

        let result = adding.await.unwrap();
        assert!(matches!(result, Err(CartError::StaleSnapshot(_))));
        assert!(service.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_serialized() {
        let api = FakeApi::default();
        api.stock(product("p-1", "shop-a", dec!(100), 10));
        api.delay_on(Op::AddToCart, std::time::Duration::from_millis(20));
        let service = Arc::new(service(api));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.add_item(add("p-1", 1, "shop-a")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(service.api().max_in_flight(), 1);
        assert_eq!(service.snapshot().await.item_count(), 4);
    }
}
