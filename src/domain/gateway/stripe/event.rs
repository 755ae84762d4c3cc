//! Stripe webhook event types.
//!
//! Only the fields the checkout flow reads are captured; the rest of
//! Stripe's schema is ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Event id (`evt_…`).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// Polymorphic on event type.
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Event types the checkout flow reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                Self::CheckoutSessionAsyncPaymentSucceeded
            }
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentSucceeded => {
                "checkout.session.async_payment_succeeded"
            }
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::Unknown => "unknown",
        }
    }
}

/// `checkout.session` object as delivered in webhooks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Session id (`cs_…`).
    pub id: String,

    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,

    #[serde(default)]
    pub client_reference_id: Option<String>,

    /// Correlation keys written at session creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    /// Order reference from metadata, falling back to `client_reference_id`.
    pub fn order_reference(&self) -> Option<&str> {
        self.metadata
            .get("order_id")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}
