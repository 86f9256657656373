//! Cart commands.
//!
//! Each invocation starts a fresh session, so the remote cart is loaded
//! before any mutation.

use dialoguer::Confirm;
use kiosk_core::{ProductId, ShopId};
use kiosk_storefront::ShopperSession;
use kiosk_storefront::cart::{AddItem, AddOutcome};

use super::{CommandError, print_cart};

pub async fn show(session: &ShopperSession) -> Result<(), CommandError> {
    let cart = session.cart().load().await?;
    print_cart(&cart, session.config().currency);
    Ok(())
}

/// Add a product, asking before a cart from another shop is replaced.
pub async fn add(
    session: &ShopperSession,
    product_id: &str,
    quantity: u32,
    shop: Option<String>,
    yes: bool,
) -> Result<(), CommandError> {
    let product_id = ProductId::new(product_id);
    let shop_id = match shop {
        Some(shop) => ShopId::new(shop),
        None => {
            session
                .product_price(&product_id)
                .await?
                .product
                .snapshot
                .shop_id
        }
    };

    let service = session.cart();
    service.load().await?;

    let outcome = service
        .add_item(AddItem {
            product_id,
            quantity,
            shop_id,
        })
        .await?;

    let cart = match outcome {
        AddOutcome::Added(cart) => cart,
        AddOutcome::NeedsShopSwitch(switch) => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!(
                        "Your cart has items from {}. Clear it and add from {}?",
                        switch.current_shop(),
                        switch.requested_shop()
                    ))
                    .default(false)
                    .interact()?;
            if !confirmed {
                tracing::info!("Shop switch declined; cart unchanged");
                return Ok(());
            }
            match service.confirm_shop_switch(switch).await? {
                AddOutcome::Added(cart) => cart,
                AddOutcome::NeedsShopSwitch(_) => service.snapshot().await,
            }
        }
    };

    print_cart(&cart, session.config().currency);
    Ok(())
}

pub async fn update(
    session: &ShopperSession,
    product_id: &str,
    quantity: u32,
) -> Result<(), CommandError> {
    session.cart().load().await?;
    let updated = session
        .cart()
        .update_quantity(&ProductId::new(product_id), quantity)
        .await?;
    print_cart(&updated, session.config().currency);
    Ok(())
}

pub async fn remove(session: &ShopperSession, product_id: &str) -> Result<(), CommandError> {
    session.cart().load().await?;
    let updated = session
        .cart()
        .remove_item(&ProductId::new(product_id))
        .await?;
    print_cart(&updated, session.config().currency);
    Ok(())
}

pub async fn clear(session: &ShopperSession) -> Result<(), CommandError> {
    let cart = session.cart().clear().await?;
    print_cart(&cart, session.config().currency);
    Ok(())
}
