//! Shopper session state.

use std::sync::Arc;

use kiosk_core::{Clock, EffectivePrice, Price, Product, ProductId, SystemClock, resolve_price};
use tracing::info;

use crate::cart::{CartService, CartStore};
use crate::commerce::{ApiError, CommerceApi, CommerceClient, Freshness};
use crate::config::StorefrontConfig;
use crate::error::{CartError, Result};
use crate::payment::PaymentReconciler;

/// Everything a signed-in shopper's screens share.
///
/// Created at session start and torn down by [`ShopperSession::logout`].
/// Cheaply cloneable via `Arc`.
pub struct ShopperSession<A = CommerceClient> {
    inner: Arc<ShopperSessionInner<A>>,
}

struct ShopperSessionInner<A> {
    config: StorefrontConfig,
    clock: Arc<dyn Clock>,
    cart: Arc<CartService<A>>,
}

impl<A> Clone for ShopperSession<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for ShopperSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopperSession")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Effective price of a product with its display values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub product: Product,
    pub effective: EffectivePrice,
    pub display: Price,
}

impl PriceQuote {
    /// "N% OFF" badge, if a saving applies.
    #[must_use]
    pub fn badge(&self) -> Option<String> {
        self.effective.badge()
    }
}

impl ShopperSession<CommerceClient> {
    /// Start a session against the HTTP commerce API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn start(config: StorefrontConfig) -> std::result::Result<Self, ApiError> {
        let api = CommerceClient::new(&config.api)?;
        Ok(Self::with_api(config, api, Arc::new(SystemClock)))
    }
}

impl<A: CommerceApi> ShopperSession<A> {
    /// Start a session with an explicit API implementation and clock.
    #[must_use]
    pub fn with_api(config: StorefrontConfig, api: A, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(CartStore::new(Arc::clone(&clock)));
        Self {
            inner: Arc::new(ShopperSessionInner {
                config,
                clock,
                cart: Arc::new(CartService::new(api, store)),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The shopper's cart.
    #[must_use]
    pub fn cart(&self) -> &Arc<CartService<A>> {
        &self.inner.cart
    }

    /// A fresh reconciler for one payment redirect.
    #[must_use]
    pub fn payment_reconciler(&self) -> PaymentReconciler<A> {
        PaymentReconciler::new(
            Arc::clone(&self.inner.cart),
            self.inner.config.payment_redirect_delay,
        )
    }

    /// Effective price of a catalog product right now.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Fetch` if the product cannot be read.
    pub async fn product_price(&self, product_id: &ProductId) -> Result<PriceQuote> {
        let product = self
            .inner
            .cart
            .api()
            .fetch_product(product_id, Freshness::Cached)
            .await
            .map_err(CartError::Fetch)?;
        let effective = resolve_price(&product.snapshot.pricing, self.inner.clock.now());
        let display = Price::new(effective.amount, self.inner.config.currency);
        Ok(PriceQuote {
            product,
            effective,
            display,
        })
    }

    /// End the session: drop the local cart. Any mutation still in flight
    /// fails with `StaleSnapshot` instead of writing.
    pub async fn logout(&self) {
        let version = self.inner.cart.reset().await;
        info!(version = version.get(), "Shopper logged out");
    }
}
