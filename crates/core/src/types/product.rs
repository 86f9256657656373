//! Catalog product types.
//!
//! Products are owned by the remote catalog; the cart engine treats them as
//! read-only input. [`ProductSnapshot`] is the denormalized copy stored on each
//! cart line so the cart can be displayed without a second fetch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ProductId, ShopId};

/// Largest percentage discount a product may carry.
pub const MAX_DISCOUNT_PERCENT: u8 = 99;

/// Errors for pricing data that violates catalog rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Base price is zero or negative.
    #[error("base price must be positive (got {0})")]
    NonPositiveBasePrice(Decimal),
    /// Discount outside 0..=99.
    #[error("discount must be between 0 and {MAX_DISCOUNT_PERCENT} percent (got {0})")]
    DiscountOutOfRange(u8),
    /// Flash-sale price not below base price.
    #[error("flash-sale price {flash} must be below base price {base}")]
    FlashPriceNotBelowBase {
        /// Flash-sale price.
        flash: Decimal,
        /// Base price.
        base: Decimal,
    },
}

/// Pricing-relevant fields of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInfo {
    /// Regular price.
    pub base_price: Decimal,
    /// Standing percentage discount (0-99).
    #[serde(default)]
    pub discount_percent: Option<u8>,
    /// Time-bounded override price.
    #[serde(default)]
    pub flash_sale_price: Option<Decimal>,
    /// Instant the flash sale stops applying.
    #[serde(default)]
    pub flash_sale_ends_at: Option<DateTime<Utc>>,
}

impl PricingInfo {
    /// Pricing with only a base price.
    #[must_use]
    pub const fn regular(base_price: Decimal) -> Self {
        Self {
            base_price,
            discount_percent: None,
            flash_sale_price: None,
            flash_sale_ends_at: None,
        }
    }

    /// Set a standing percentage discount.
    #[must_use]
    pub const fn with_discount(mut self, percent: u8) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    /// Set a flash sale ending at `ends_at`.
    #[must_use]
    pub const fn with_flash_sale(mut self, price: Decimal, ends_at: DateTime<Utc>) -> Self {
        self.flash_sale_price = Some(price);
        self.flash_sale_ends_at = Some(ends_at);
        self
    }

    /// Check the catalog rules for pricing data.
    ///
    /// # Errors
    ///
    /// Returns the first [`PricingError`] found.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.base_price <= Decimal::ZERO {
            return Err(PricingError::NonPositiveBasePrice(self.base_price));
        }
        if let Some(percent) = self.discount_percent
            && percent > MAX_DISCOUNT_PERCENT
        {
            return Err(PricingError::DiscountOutOfRange(percent));
        }
        if let Some(flash) = self.flash_sale_price
            && flash >= self.base_price
        {
            return Err(PricingError::FlashPriceNotBelowBase {
                flash,
                base: self.base_price,
            });
        }
        Ok(())
    }
}

/// Denormalized product data carried on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Display name.
    pub name: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Pricing fields.
    #[serde(flatten)]
    pub pricing: PricingInfo,
    /// Units available at the time the snapshot was taken.
    pub stock: u32,
    /// Shop selling the product.
    pub shop_id: ShopId,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Product data.
    #[serde(flatten)]
    pub snapshot: ProductSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_accepts_regular_pricing() {
        assert_eq!(PricingInfo::regular(dec!(1000)).validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zero_base_price() {
        assert_eq!(
            PricingInfo::regular(Decimal::ZERO).validate(),
            Err(PricingError::NonPositiveBasePrice(Decimal::ZERO))
        );
    }

    #[test]
    fn test_validate_rejects_discount_of_one_hundred() {
        let pricing = PricingInfo::regular(dec!(1000)).with_discount(100);
        assert_eq!(
            pricing.validate(),
            Err(PricingError::DiscountOutOfRange(100))
        );
    }

    #[test]
    fn test_validate_rejects_flash_price_at_base() {
        let pricing = PricingInfo::regular(dec!(1000)).with_flash_sale(dec!(1000), Utc::now());
        assert!(matches!(
            pricing.validate(),
            Err(PricingError::FlashPriceNotBelowBase { .. })
        ));
    }
}
