//! Wire types for the commerce API.
//!
//! These mirror the JSON payloads exactly; [`super::conversions`] turns them
//! into the cart engine's domain types.

use kiosk_core::{CartItemId, PaymentReference, PaymentStatus, ProductId, ProductSnapshot, ShopId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ApiError;

// =============================================================================
// Envelope
// =============================================================================

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap `data`, translating `success: false` into [`ApiError::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns `Rejected` on `success: false` and `MissingData` when `data`
    /// is absent.
    pub fn into_data(self, what: &'static str) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.rejection_message()));
        }
        self.data.ok_or(ApiError::MissingData(what))
    }

    /// Check `success` and discard any `data`.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` on `success: false`.
    pub fn into_ack(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(self.rejection_message()))
        }
    }

    fn rejection_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "request was rejected".to_string())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart snapshot returned by `GET /cart` and the line mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartItemPayload>,
    #[serde(default)]
    pub shop_id: Option<ShopId>,
    #[serde(default)]
    pub coupon: Option<CouponPayload>,
}

/// One cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

/// Data of `DELETE /cart/item/{productId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedItemPayload {
    pub product_id: ProductId,
}

/// Coupon priced against the current cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPayload {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    pub discount_amount: Decimal,
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /cart/add-to-cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Body of `PATCH /cart/item/{productId}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// Body of `POST /cart/coupon`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyCouponRequest<'a> {
    pub code: &'a str,
}

/// Body of `POST /payment/confirm`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest<'a> {
    pub payment_reference: &'a PaymentReference,
    pub status: PaymentStatus,
}
