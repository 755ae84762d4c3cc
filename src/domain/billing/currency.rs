//! Currencies orders are priced in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// ISO 4217 currency of an order amount.
///
/// Amounts are stored in whole units (sum, dollars), never in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Uzs,
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Uzs => "UZS",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UZS" => Ok(Currency::Uzs),
            "USD" => Ok(Currency::Usd),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("unsupported currency '{}'", other),
            )),
        }
    }
}
