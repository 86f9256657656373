//! Unified error handling with Sentry integration.
//!
//! Every cart, coupon and payment operation returns `Result<T, CartError>`.
//! Validation failures are raised before any network call; remote failures
//! leave the cart snapshot untouched. [`CartError::user_message`] gives the
//! short, actionable text shown to the shopper.

use kiosk_core::ProductId;
use thiserror::Error;

use crate::cart::StaleSnapshot;
use crate::commerce::ApiError;
use crate::payment::PaymentFailure;

/// Locally detectable bad input. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Coupon code empty or whitespace only.
    #[error("Enter a coupon code")]
    EmptyCouponCode,

    /// A coupon is already attached to the cart.
    #[error("A coupon is already applied to this cart")]
    CouponAlreadyApplied,

    /// Operation needs items in the cart.
    #[error("Your cart is empty")]
    EmptyCart,

    /// Quantity of zero requested for an add.
    #[error("Quantity must be at least 1")]
    ZeroQuantity,

    /// Quantity outside `1..=stock`.
    #[error("Quantity must be between 1 and {stock} (got {requested})")]
    QuantityOutOfRange { requested: u32, stock: u32 },

    /// Not enough stock for the requested add.
    #[error("Only {available} left in stock (requested {requested})")]
    InsufficientStock { requested: u32, available: u32 },

    /// The product has no line in the cart.
    #[error("Product {0} is not in your cart")]
    ItemNotInCart(ProductId),
}

/// Cart engine error taxonomy.
#[derive(Debug, Error)]
pub enum CartError {
    /// Bad input rejected locally.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The remote service rejected an add, update, remove or clear.
    #[error("Cart mutation failed: {0}")]
    CartMutation(#[source] ApiError),

    /// The remote service rejected a coupon code.
    #[error("Coupon rejected: {0}")]
    Coupon(#[source] ApiError),

    /// Payment could not be verified or confirmed.
    #[error("Payment verification failed: {0}")]
    PaymentVerification(#[from] PaymentFailure),

    /// A read failed (transport or non-success response).
    #[error("Fetch failed: {0}")]
    Fetch(#[source] ApiError),

    /// The cart was reset while the request was in flight.
    #[error(transparent)]
    StaleSnapshot(#[from] StaleSnapshot),
}

impl CartError {
    /// Short message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::CartMutation(err) => err.reason().map_or_else(
                || "We couldn't update your cart. Please try again.".to_string(),
                str::to_owned,
            ),
            Self::Coupon(err) => err.reason().map_or_else(
                || "That coupon couldn't be applied.".to_string(),
                str::to_owned,
            ),
            Self::PaymentVerification(_) => {
                "We couldn't confirm your payment. Your cart has been kept so you can try again."
                    .to_string()
            }
            Self::Fetch(_) => "We couldn't load your cart. Please refresh and try again.".to_string(),
            Self::StaleSnapshot(_) => {
                "Your cart changed while this was in progress. Please try again.".to_string()
            }
        }
    }

    /// Whether the error points at a fault outside the shopper's control and
    /// should be reported to Sentry.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Fetch(err) | Self::CartMutation(err) | Self::Coupon(err) => matches!(
                err,
                ApiError::Parse(_) | ApiError::MissingData(_) | ApiError::InvalidData(_)
            ),
            Self::PaymentVerification(failure) => failure.is_unexpected(),
            Self::Validation(_) | Self::StaleSnapshot(_) => false,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Capture an unexpected error to Sentry and log it.
pub fn report(err: &CartError) {
    if err.is_unexpected() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Unexpected cart error"
        );
    } else {
        tracing::warn!(error = %err, "Cart operation failed");
    }
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p-123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
