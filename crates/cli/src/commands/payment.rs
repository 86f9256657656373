//! Payment redirect reconciliation.

use kiosk_storefront::ShopperSession;
use kiosk_storefront::payment::{PaymentOutcome, ReconcileState};
use tokio::sync::oneshot;

use super::CommandError;

/// Reconcile a redirect query, then wait out the redirect delay before
/// reporting where the shopper goes next.
#[allow(clippy::print_stdout)]
pub async fn reconcile(session: &ShopperSession, query: &str) -> Result<(), CommandError> {
    session.cart().load().await?;

    let outcome = PaymentOutcome::from_query(query);
    let reconciler = session.payment_reconciler();
    let state = reconciler.reconcile(&outcome).await;

    match &state {
        ReconcileState::Succeeded => println!("Payment confirmed. Your cart has been cleared."),
        ReconcileState::Failed(failure) => println!("Payment not completed: {failure}"),
        ReconcileState::Processing => println!("Payment still processing"),
    }

    let (tx, rx) = oneshot::channel();
    if reconciler
        .schedule_follow_up(move |state| {
            let _ = tx.send(state);
        })
        .await
        && let Ok(state) = rx.await
    {
        let destination = match state {
            ReconcileState::Succeeded => "orders",
            _ => "cart",
        };
        println!("Returning to {destination}");
    }

    match state.error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
