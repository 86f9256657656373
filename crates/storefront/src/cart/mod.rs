//! Shopper cart: snapshot store, mutation flows and coupons.
//!
//! [`CartStore`] holds the local copy of the remote cart. [`CartService`]
//! is the only writer: it validates input, serializes mutations and applies
//! confirmed results.

mod coupon;
mod model;
mod service;
mod store;

pub use model::{
    Cart, CartContents, CartItem, CartStatus, CartTotals, Coupon, MixedShops, RemoteCart,
};
pub use service::{AddItem, AddOutcome, CartService, ShopSwitch};
pub use store::{CartStore, CartVersion, SnapshotDelta, StaleSnapshot};
