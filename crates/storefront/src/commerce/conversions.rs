//! Type conversions from commerce API payloads to cart domain types.
//!
//! Anything that would break a cart invariant (mixed shops, invalid pricing)
//! is turned into [`ApiError::InvalidData`] here so it never reaches the store.

use kiosk_core::Product;

use super::ApiError;
use super::types::{CartItemPayload, CartPayload, CouponPayload};
use crate::cart::{CartContents, CartItem, Coupon, RemoteCart};

/// Convert a cart payload into validated cart contents.
pub fn convert_cart(payload: CartPayload) -> Result<CartContents, ApiError> {
    let items = payload
        .items
        .into_iter()
        .map(convert_cart_item)
        .collect::<Result<Vec<_>, _>>()?;

    CartContents::new(items, payload.shop_id).map_err(|e| ApiError::InvalidData(e.to_string()))
}

/// Convert a full `GET /cart` payload, including any attached coupon.
pub fn convert_remote_cart(mut payload: CartPayload) -> Result<RemoteCart, ApiError> {
    let coupon = payload.coupon.take().map(convert_coupon).transpose()?;
    Ok(RemoteCart {
        contents: convert_cart(payload)?,
        coupon,
    })
}

fn convert_cart_item(item: CartItemPayload) -> Result<CartItem, ApiError> {
    if item.quantity == 0 {
        return Err(ApiError::InvalidData(format!(
            "cart line {} has zero quantity",
            item.product_id
        )));
    }
    item.product.pricing.validate().map_err(|e| {
        ApiError::InvalidData(format!("product {}: {e}", item.product_id))
    })?;

    Ok(CartItem {
        id: item.id,
        product_id: item.product_id,
        quantity: item.quantity,
        product: item.product,
    })
}

/// Convert a coupon payload. A missing message defaults to a generic
/// confirmation.
pub fn convert_coupon(payload: CouponPayload) -> Result<Coupon, ApiError> {
    if payload.discount_amount.is_sign_negative() {
        return Err(ApiError::InvalidData(format!(
            "coupon {} has negative discount",
            payload.code
        )));
    }
    let message = payload
        .message
        .unwrap_or_else(|| format!("Coupon {} applied", payload.code));

    Ok(Coupon {
        code: payload.code,
        message,
        discount: payload.discount_amount,
    })
}

/// Validate a catalog product.
pub fn convert_product(product: Product) -> Result<Product, ApiError> {
    product
        .snapshot
        .pricing
        .validate()
        .map_err(|e| ApiError::InvalidData(format!("product {}: {e}", product.id)))?;
    Ok(product)
}
