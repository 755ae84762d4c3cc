//! Supported payment providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Payment provider an order is settled through.
///
/// Closed set: adding a provider is a compile-time change to every
/// `match` over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Hosted checkout sessions confirmed by signed webhooks.
    Stripe,
    /// Synchronous JSON-RPC merchant API.
    Payme,
    /// Form-POST prepare/complete callbacks.
    Click,
}

impl PaymentProvider {
    pub const ALL: [PaymentProvider; 3] = [Self::Stripe, Self::Payme, Self::Click];

    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Payme => "payme",
            PaymentProvider::Click => "click",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(PaymentProvider::Stripe),
            "payme" => Ok(PaymentProvider::Payme),
            "click" => Ok(PaymentProvider::Click),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown payment provider '{}'", other),
            )),
        }
    }
}
