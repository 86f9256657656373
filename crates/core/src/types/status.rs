//! Status enums for various entities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Result reported by the payment provider's redirect.
///
/// Providers report many intermediate states; anything that is neither a
/// clear success nor a clear failure is [`PaymentStatus::Indeterminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
    #[default]
    Indeterminate,
}

impl PaymentStatus {
    /// Wire representation sent to the payment confirmation endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Indeterminate => "indeterminate",
        }
    }

    /// Whether the provider reported a completed payment.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    /// Parse a provider `redirect_status` value. Never fails: unknown values
    /// map to [`PaymentStatus::Indeterminate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "succeeded" | "success" | "paid" => Self::Succeeded,
            "failed" | "canceled" | "cancelled" | "requires_payment_method" => Self::Failed,
            _ => Self::Indeterminate,
        })
    }
}
