//! CLI command implementations.

pub mod cart;
pub mod coupon;
pub mod payment;
pub mod price;

use kiosk_core::{Clock, CurrencyCode, Price, SystemClock};
use kiosk_storefront::CartError;
use kiosk_storefront::cart::Cart;
use kiosk_storefront::commerce::ApiError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// HTTP client could not be created.
    #[error("Commerce API client error: {0}")]
    Client(#[from] ApiError),

    /// A cart, coupon or payment operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Interactive prompt failed.
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Print the shopper-facing message for a failed command.
#[allow(clippy::print_stderr)]
pub fn print_error(err: &CommandError) {
    match err {
        CommandError::Cart(cart) => eprintln!("{}", cart.user_message()),
        other => eprintln!("{other}"),
    }
}

/// Print a cart with resolved line prices and totals.
#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &Cart, currency: CurrencyCode) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    let now = SystemClock.now();
    let shop = cart.shop_id().map_or("-", |shop| shop.as_str());
    println!("Cart from shop {shop} ({} items)", cart.item_count());

    for item in cart.items() {
        let unit = item.unit_price(now);
        let badge = unit.badge().map(|b| format!(" [{b}]")).unwrap_or_default();
        println!(
            "  {:<12} {:<28} {:>3} x {:>10} = {:>10}{badge}",
            item.product_id,
            item.product.name,
            item.quantity,
            Price::new(unit.amount, currency).display(),
            Price::new(unit.line_total(item.quantity), currency).display(),
        );
    }

    if let Some(coupon) = &cart.coupon {
        println!("  Coupon {}: {}", coupon.code, coupon.message);
    }
    println!(
        "  Subtotal {}  Discount {}  Total {}",
        Price::new(cart.totals.original, currency).display(),
        Price::new(cart.totals.discount, currency).display(),
        Price::new(cart.totals.final_amount, currency).display(),
    );
}
