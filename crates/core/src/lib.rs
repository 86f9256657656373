//! Kiosk Core - Shared types and price resolution.
//!
//! This crate provides the types used across all Kiosk components:
//! - `storefront` - Cart engine talking to the remote commerce API
//! - `cli` - Command-line driver for the engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows the price resolver to be
//! called from every surface (catalog card, product detail, cart line, order
//! summary) with identical results.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, product pricing and statuses
//! - [`pricing`] - Effective price resolution and the [`pricing::Clock`] seam

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{Clock, EffectivePrice, FixedClock, PriceSource, SystemClock, resolve_price};
pub use types::*;
