//! Effective price resolution.
//!
//! [`resolve_price`] is the single place an effective price is computed. The
//! catalog card, product detail, cart line and order summary all call it so
//! they can never disagree. It is pure: for a fixed [`PricingInfo`] and clock
//! reading it always returns the same [`EffectivePrice`].
//!
//! # Precedence
//!
//! 1. Active flash sale (`now < flash_sale_ends_at`): the flash-sale price.
//! 2. Percentage discount > 0: `base - base * discount / 100`, rounded to the
//!    nearest whole currency unit.
//! 3. Otherwise the base price.
//!
//! A flash sale without an end time never applies.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::types::PricingInfo;

/// Source of the current time.
///
/// Injected wherever prices are resolved so tests can pin the clock.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Which rule produced an [`EffectivePrice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    FlashSale,
    Discount,
    Regular,
}

/// Resolved price for a product at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectivePrice {
    /// Price to charge and display.
    pub amount: Decimal,
    /// Regular price before any reduction.
    pub base: Decimal,
    /// Whole percent saved relative to `base` (0 when nothing applies).
    pub percent_off: u8,
    /// Rule that produced `amount`.
    pub source: PriceSource,
}

impl EffectivePrice {
    /// Discount badge text, e.g. `"30% OFF"`.
    #[must_use]
    pub fn badge(&self) -> Option<String> {
        (self.percent_off > 0).then(|| format!("{}% OFF", self.percent_off))
    }

    /// Amount for `quantity` units.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Decimal {
        self.amount * Decimal::from(quantity)
    }
}

/// Resolve the effective price of `pricing` at `now`.
#[must_use]
pub fn resolve_price(pricing: &PricingInfo, now: DateTime<Utc>) -> EffectivePrice {
    let base = pricing.base_price;

    if let (Some(flash), Some(ends_at)) = (pricing.flash_sale_price, pricing.flash_sale_ends_at)
        && now < ends_at
    {
        return EffectivePrice {
            amount: flash,
            base,
            percent_off: percent_saved(base, flash),
            source: PriceSource::FlashSale,
        };
    }

    match pricing.discount_percent {
        Some(percent) if percent > 0 => {
            let reduction = base * Decimal::from(percent) / Decimal::ONE_HUNDRED;
            EffectivePrice {
                amount: round_to_unit(base - reduction),
                base,
                percent_off: percent,
                source: PriceSource::Discount,
            }
        }
        _ => EffectivePrice {
            amount: base,
            base,
            percent_off: 0,
            source: PriceSource::Regular,
        },
    }
}

fn round_to_unit(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Percent of `base` saved by paying `price`, rounded to a whole percent.
fn percent_saved(base: Decimal, price: Decimal) -> u8 {
    (base - price)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(base))
        .map(round_to_unit)
        .and_then(|percent| percent.to_u8())
        .unwrap_or(0)
}
