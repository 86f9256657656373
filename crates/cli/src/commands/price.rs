//! Price lookup.

use kiosk_core::{Price, ProductId};
use kiosk_storefront::ShopperSession;

use super::CommandError;

/// Print the effective price of a product, with the regular price and badge
/// when a saving applies.
#[allow(clippy::print_stdout)]
pub async fn show(session: &ShopperSession, product_id: &str) -> Result<(), CommandError> {
    let quote = session.product_price(&ProductId::new(product_id)).await?;
    let snapshot = &quote.product.snapshot;

    match quote.badge() {
        Some(badge) => println!(
            "{}: {} (was {}) {badge}",
            snapshot.name,
            quote.display.display(),
            Price::new(quote.effective.base, quote.display.currency_code).display(),
        ),
        None => println!("{}: {}", snapshot.name, quote.display.display()),
    }
    println!("Shop {}, {} in stock", snapshot.shop_id, snapshot.stock);
    Ok(())
}
