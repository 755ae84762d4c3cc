//! Currency conversion strategy.
//!
//! Orders are priced in whole units of their own currency; some providers
//! charge in another currency's minor units (Stripe charges USD cents).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::Currency;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("No rate from {from} to {to}")]
    UnsupportedPair { from: Currency, to: Currency },

    #[error("Amount {0} cannot be converted")]
    InvalidAmount(i64),
}

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Converts whole units of `from` into minor units of `to`.
    async fn to_minor_units(
        &self,
        amount: i64,
        from: Currency,
        to: Currency,
    ) -> Result<i64, ConversionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converter_is_object_safe() {
        fn _accepts_dyn(_converter: &dyn CurrencyConverter) {}
    }
}
