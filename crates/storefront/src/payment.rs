//! Payment reconciliation after the provider redirects back.
//!
//! A [`PaymentReconciler`] is a one-shot state machine:
//!
//! ```text
//! Processing ──► Succeeded
//!      │
//!      └───────► Failed
//! ```
//!
//! Only a successful result with a payment reference is confirmed remotely,
//! and the cart is cleared only after confirmation succeeds. Once terminal,
//! every further trigger returns the terminal state without side effects.
//! Concurrent triggers queue on the state lock and observe the first one's
//! outcome.

use std::sync::Arc;
use std::time::Duration;

use kiosk_core::{PaymentReference, PaymentStatus};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::cart::CartService;
use crate::commerce::CommerceApi;
use crate::error::{CartError, add_breadcrumb, report};

/// Query keys that may carry the payment reference.
const REFERENCE_KEYS: [&str; 2] = ["payment_intent", "payment_reference"];

/// Query key carrying the provider's result.
const STATUS_KEY: &str = "redirect_status";

/// What the provider reported on redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub reference: Option<PaymentReference>,
    pub status: PaymentStatus,
}

impl PaymentOutcome {
    #[must_use]
    pub const fn new(reference: Option<PaymentReference>, status: PaymentStatus) -> Self {
        Self { reference, status }
    }

    /// Parse a redirect query string such as
    /// `?payment_intent=pi_123&redirect_status=succeeded`.
    ///
    /// A blank reference counts as missing; an unknown status is
    /// [`PaymentStatus::Indeterminate`].
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut outcome = Self::new(None, PaymentStatus::Indeterminate);

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if REFERENCE_KEYS.iter().any(|candidate| *candidate == key) {
                let value = value.trim();
                if !value.is_empty() {
                    outcome.reference = Some(PaymentReference::new(value));
                }
            } else if key == STATUS_KEY {
                let Ok(status) = value.parse::<PaymentStatus>();
                outcome.status = status;
            }
        }

        outcome
    }
}

/// Why a payment ended in [`ReconcileState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentFailure {
    #[error("payment reference is missing")]
    MissingReference,

    #[error("payment did not succeed (status: {0})")]
    NotSucceeded(PaymentStatus),

    #[error("payment confirmation failed: {0}")]
    ConfirmationFailed(String),

    #[error("payment confirmed but the cart could not be cleared: {0}")]
    ClearFailed(String),
}

impl PaymentFailure {
    /// Failures caused by the remote side rather than the provider result.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::ConfirmationFailed(_) | Self::ClearFailed(_))
    }
}

/// Reconciliation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReconcileState {
    #[default]
    Processing,
    Succeeded,
    Failed(PaymentFailure),
}

impl ReconcileState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// The failure as a [`CartError`], if this is `Failed`.
    #[must_use]
    pub fn error(&self) -> Option<CartError> {
        match self {
            Self::Failed(failure) => Some(CartError::PaymentVerification(failure.clone())),
            Self::Processing | Self::Succeeded => None,
        }
    }
}

/// One-shot reconciler for a single payment redirect.
pub struct PaymentReconciler<A> {
    cart: Arc<CartService<A>>,
    state: Mutex<ReconcileState>,
    follow_up: Mutex<Option<JoinHandle<()>>>,
    redirect_delay: Duration,
}

impl<A> std::fmt::Debug for PaymentReconciler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentReconciler")
            .field("redirect_delay", &self.redirect_delay)
            .finish_non_exhaustive()
    }
}

impl<A: CommerceApi> PaymentReconciler<A> {
    #[must_use]
    pub fn new(cart: Arc<CartService<A>>, redirect_delay: Duration) -> Self {
        Self {
            cart,
            state: Mutex::new(ReconcileState::Processing),
            follow_up: Mutex::new(None),
            redirect_delay,
        }
    }

    /// Current state.
    pub async fn state(&self) -> ReconcileState {
        self.state.lock().await.clone()
    }

    /// Drive the state machine with a provider outcome.
    ///
    /// Returns the resulting state. In a terminal state the input is ignored.
    #[instrument(skip(self, outcome), fields(reference = ?outcome.reference, status = %outcome.status))]
    pub async fn reconcile(&self, outcome: &PaymentOutcome) -> ReconcileState {
        let mut state = self.state.lock().await;
        if state.is_terminal() {
            debug!(state = ?*state, "Payment already reconciled; ignoring");
            return state.clone();
        }

        *state = match self.settle(outcome).await {
            Ok(()) => {
                info!("Payment confirmed and cart cleared");
                add_breadcrumb("payment", "Payment succeeded", None);
                ReconcileState::Succeeded
            }
            Err(failure) => {
                report(&CartError::PaymentVerification(failure.clone()));
                ReconcileState::Failed(failure)
            }
        };
        state.clone()
    }

    async fn settle(&self, outcome: &PaymentOutcome) -> Result<(), PaymentFailure> {
        let reference = outcome
            .reference
            .as_ref()
            .ok_or(PaymentFailure::MissingReference)?;
        if !outcome.status.is_success() {
            return Err(PaymentFailure::NotSucceeded(outcome.status));
        }

        self.cart
            .api()
            .confirm_payment(reference, outcome.status)
            .await
            .map_err(|e| PaymentFailure::ConfirmationFailed(e.to_string()))?;
        // Reported once, as the payment failure below.
        self.cart
            .clear_unreported()
            .await
            .map_err(|e| PaymentFailure::ClearFailed(e.to_string()))?;
        Ok(())
    }

    /// Run `navigate` with the terminal state after the redirect delay.
    ///
    /// Returns `false` (and schedules nothing) while still `Processing`.
    /// Scheduling again replaces the pending follow-up. Dropping the
    /// reconciler cancels it.
    pub async fn schedule_follow_up<F>(&self, navigate: F) -> bool
    where
        F: FnOnce(ReconcileState) + Send + 'static,
    {
        let state = self.state().await;
        if !state.is_terminal() {
            return false;
        }

        let delay = self.redirect_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigate(state);
        });
        if let Some(previous) = self.follow_up.lock().await.replace(handle) {
            previous.abort();
        }
        true
    }
}

impl<A> Drop for PaymentReconciler<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.follow_up.get_mut().take() {
            handle.abort();
        }
    }
}
