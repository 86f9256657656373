//! Kiosk storefront cart engine.
//!
//! Keeps a shopper's cart consistent with the remote commerce service:
//! - [`cart`] - snapshot store, serialized mutation flows, coupons
//! - [`payment`] - one-shot reconciliation of payment redirects
//! - [`commerce`] - the remote API seam and its HTTP client
//! - [`state`] - the per-shopper session tying these together
//!
//! Prices are resolved by `kiosk_core::resolve_price`; nothing here computes
//! an effective price on its own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod commerce;
pub mod config;
pub mod error;
pub mod payment;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{CartError, ValidationError};
pub use state::{PriceQuote, ShopperSession};
