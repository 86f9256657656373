//! Coupon commands.

use kiosk_storefront::ShopperSession;

use super::{CommandError, print_cart};

pub async fn apply(session: &ShopperSession, code: &str) -> Result<(), CommandError> {
    session.cart().load().await?;
    let cart = session.cart().apply_coupon(code).await?;
    print_cart(&cart, session.config().currency);
    Ok(())
}
