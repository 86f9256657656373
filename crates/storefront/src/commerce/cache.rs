//! In-memory cache for catalog products.
//!
//! Only catalog reads are cached. Cart, coupon and payment calls mutate
//! remote state and always go to the network.

use std::time::Duration;

use kiosk_core::{Product, ProductId};
use moka::future::Cache;

/// Upper bound on cached products.
const MAX_CACHED_PRODUCTS: u64 = 1_000;

/// TTL cache of catalog products keyed by id.
#[derive(Clone)]
pub struct ProductCache {
    inner: Cache<ProductId, Product>,
}

impl ProductCache {
    /// Create a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CACHED_PRODUCTS)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, product_id: &ProductId) -> Option<Product> {
        self.inner.get(product_id).await
    }

    pub async fn insert(&self, product: Product) {
        self.inner.insert(product.id.clone(), product).await;
    }

    pub async fn invalidate(&self, product_id: &ProductId) {
        self.inner.invalidate(product_id).await;
    }
}
