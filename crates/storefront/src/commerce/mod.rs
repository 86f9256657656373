//! Remote commerce API access.
//!
//! # Architecture
//!
//! - JSON over HTTPS, bearer-token authenticated, via `reqwest`
//! - The remote service is the system of record - the cart engine only keeps
//!   an optimistic local cache of its state
//! - Catalog products are cached in memory via `moka` (TTL from config); cart
//!   and payment calls are never cached
//! - Every response uses the `{success, data?, message?}` envelope;
//!   `success: false` is a domain rejection, surfaced as [`ApiError::Rejected`]
//!
//! # Endpoints
//!
//! | Method | Path | Body | Data |
//! |--------|------|------|------|
//! | GET | `/cart` | - | cart |
//! | POST | `/cart/add-to-cart` | `{productId, quantity}` | cart |
//! | PATCH | `/cart/item/{productId}` | `{quantity}` | cart |
//! | DELETE | `/cart/item/{productId}` | - | removed product id |
//! | DELETE | `/cart` | - | - |
//! | POST | `/cart/coupon` | `{code}` | coupon |
//! | POST | `/payment/confirm` | `{paymentReference, status}` | - |
//! | GET | `/products/{productId}` | - | product |
//!
//! The [`CommerceApi`] trait is the seam the cart engine is written against;
//! [`CommerceClient`] is the HTTP implementation.

mod cache;
mod client;
mod conversions;
pub mod types;

use std::future::Future;

use kiosk_core::{PaymentReference, PaymentStatus, Product, ProductId};
use thiserror::Error;

use crate::cart::{CartContents, Coupon, RemoteCart};

pub use client::CommerceClient;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status. `message` is only set when the error body
    /// was a response envelope carrying one.
    #[error(
        "API error: {status}{}",
        .message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default()
    )]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The API answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// `success: true` without the expected `data`.
    #[error("Response is missing data: {0}")]
    MissingData(&'static str),

    /// Response data violates a domain rule.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Human-readable reason supplied by the remote service, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        let message = match self {
            Self::Status { message, .. } => message.as_deref()?,
            Self::Rejected(message) => message.as_str(),
            _ => return None,
        };
        (!message.trim().is_empty()).then_some(message)
    }
}

/// Whether a catalog read may be served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cached copy is acceptable (display).
    Cached,
    /// Bypass and refresh the cache (stock re-validation).
    Fresh,
}

/// Operations the cart engine needs from the commerce API.
pub trait CommerceApi: Send + Sync + 'static {
    /// `GET /cart`.
    fn fetch_cart(&self) -> impl Future<Output = Result<RemoteCart, ApiError>> + Send;

    /// `POST /cart/add-to-cart`.
    fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartContents, ApiError>> + Send;

    /// `PATCH /cart/item/{productId}`.
    fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartContents, ApiError>> + Send;

    /// `DELETE /cart/item/{productId}`; resolves to the removed product id.
    fn remove_item(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<ProductId, ApiError>> + Send;

    /// `DELETE /cart`.
    fn clear_cart(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /cart/coupon`.
    fn apply_coupon(&self, code: &str) -> impl Future<Output = Result<Coupon, ApiError>> + Send;

    /// `POST /payment/confirm`. Must be safe to call more than once for the
    /// same reference.
    fn confirm_payment(
        &self,
        reference: &PaymentReference,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /products/{productId}`.
    fn fetch_product(
        &self,
        product_id: &ProductId,
        freshness: Freshness,
    ) -> impl Future<Output = Result<Product, ApiError>> + Send;
}
