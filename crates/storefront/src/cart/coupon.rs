//! Coupon application.

use tracing::instrument;

use super::model::{Cart, CartStatus};
use super::service::CartService;
use super::store::SnapshotDelta;
use crate::commerce::CommerceApi;
use crate::error::{CartError, Result, ValidationError, add_breadcrumb};

impl<A: CommerceApi> CartService<A> {
    /// Attach a coupon after the remote service has validated and priced it.
    ///
    /// The code is trimmed first. Totals keep the original amount, take the
    /// remote discount and clamp the final amount at zero.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty code, an empty cart, or a cart that already
    ///   carries a coupon; no network call is made
    /// - `Coupon` with the remote reason if the code is rejected
    #[instrument(skip(self, code))]
    pub async fn apply_coupon(&self, code: &str) -> Result<Cart> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyCouponCode.into());
        }

        let _guard = self.gate.lock().await;
        let (cart, version) = self.store.read().await;
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        if cart.coupon.is_some() {
            return Err(ValidationError::CouponAlreadyApplied.into());
        }

        self.store.set_status(CartStatus::Loading).await;
        let result: Result<Cart> = async {
            let coupon = self
                .api
                .apply_coupon(code)
                .await
                .map_err(CartError::Coupon)?;
            self.store
                .apply(SnapshotDelta::Coupon(coupon), version)
                .await?;
            add_breadcrumb("cart", "Applied coupon", Some(&[("code", code)]));
            Ok(self.store.snapshot().await)
        }
        .await;

        self.settle(result).await
    }
}
