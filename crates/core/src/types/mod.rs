//! Core types for Kiosk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{PricingError, PricingInfo, Product, ProductSnapshot};
pub use status::*;
