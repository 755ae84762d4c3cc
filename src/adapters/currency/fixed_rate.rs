//! Fixed-rate UZS/USD conversion.
//!
//! The rate comes from configuration and is only as fresh as the last
//! deploy. Good enough to price a checkout, not a settlement figure.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::billing::Currency;
use crate::ports::{ConversionError, CurrencyConverter};

/// Minor units per whole unit, for both supported currencies.
const MINOR_PER_UNIT: i64 = 100;

pub struct FixedRateConverter {
    uzs_per_usd: Decimal,
}

impl FixedRateConverter {
    pub fn new(uzs_per_usd: impl Into<Decimal>) -> Self {
        Self {
            uzs_per_usd: uzs_per_usd.into(),
        }
    }

    fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, ConversionError> {
        if self.uzs_per_usd <= Decimal::ZERO {
            return Err(ConversionError::UnsupportedPair { from, to });
        }
        Ok(match (from, to) {
            (a, b) if a == b => Decimal::ONE,
            (Currency::Uzs, Currency::Usd) => Decimal::ONE / self.uzs_per_usd,
            (Currency::Usd, Currency::Uzs) => self.uzs_per_usd,
            _ => return Err(ConversionError::UnsupportedPair { from, to }),
        })
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn to_minor_units(
        &self,
        amount: i64,
        from: Currency,
        to: Currency,
    ) -> Result<i64, ConversionError> {
        if amount < 0 {
            return Err(ConversionError::InvalidAmount(amount));
        }
        let rate = self.rate(from, to)?;
        let minor = Decimal::from(amount) * rate * Decimal::from(MINOR_PER_UNIT);
        minor
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(ConversionError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sum_converts_to_cents() {
        let converter = FixedRateConverter::new(12_500);
        let cents = converter
            .to_minor_units(125_000, Currency::Uzs, Currency::Usd)
            .await
            .unwrap();
        assert_eq!(cents, 1_000);
    }

    #[tokio::test]
    async fn dollars_convert_to_tiyin() {
        let converter = FixedRateConverter::new(12_500);
        let tiyin = converter
            .to_minor_units(20, Currency::Usd, Currency::Uzs)
            .await
            .unwrap();
        assert_eq!(tiyin, 25_000_000);
    }

    #[tokio::test]
    async fn same_currency_only_scales_to_minor_units() {
        let converter = FixedRateConverter::new(12_500);
        assert_eq!(
            converter
                .to_minor_units(99_000, Currency::Uzs, Currency::Uzs)
                .await
                .unwrap(),
            9_900_000
        );
    }

    #[tokio::test]
    async fn fractional_cents_round_half_away_from_zero() {
        let converter = FixedRateConverter::new(3);
        // 1 sum = 33.33… cents
        assert_eq!(
            converter
                .to_minor_units(1, Currency::Uzs, Currency::Usd)
                .await
                .unwrap(),
            33
        );
        // 2 sum = 66.66… cents
        assert_eq!(
            converter
                .to_minor_units(2, Currency::Uzs, Currency::Usd)
                .await
                .unwrap(),
            67
        );
    }

    #[tokio::test]
    async fn negative_amounts_and_zero_rate_are_rejected() {
        let converter = FixedRateConverter::new(12_500);
        assert_eq!(
            converter
                .to_minor_units(-1, Currency::Uzs, Currency::Usd)
                .await,
            Err(ConversionError::InvalidAmount(-1))
        );

        let broken = FixedRateConverter::new(0);
        assert!(broken
            .to_minor_units(1, Currency::Uzs, Currency::Usd)
            .await
            .is_err());
    }
}
