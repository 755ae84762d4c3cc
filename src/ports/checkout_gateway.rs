//! Hosted checkout port.
//!
//! Providers that host their own payment page behind a server-created
//! session (Stripe Checkout) implement this. URL-encoded providers
//! (Payme, Click) need no outbound call.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::billing::Currency;
use crate::domain::foundation::OrderId;

#[async_trait]
pub trait HostedCheckoutGateway: Send + Sync {
    /// Creates a one-off payment session and returns where to send the buyer.
    ///
    /// Implementations must be idempotent per `order_id`.
    async fn create_session(
        &self,
        request: HostedCheckoutRequest,
    ) -> Result<HostedCheckoutSession, PaymentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckoutRequest {
    pub order_id: OrderId,
    pub product_name: String,
    /// Minor units (cents) of `currency`.
    pub amount_minor: i64,
    pub currency: Currency,
    /// Correlation keys echoed back in the webhook.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckoutSession {
    pub id: String,
    pub url: String,
}

/// Payment error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    InvalidRequest,
    RateLimited,
    ProviderError,
    InvalidResponse,
}

impl PaymentErrorCode {
    /// Network failures and provider 5xx are worth another attempt.
    /// Every 4xx, including rate limiting, is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::ProviderError
        )
    }
}

impl fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::RateLimited => "rate_limited",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

/// Error from a payment provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Provider's error code (if available).
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn HostedCheckoutGateway) {}
    }

    #[test]
    fn retryability_follows_code() {
        assert!(PaymentError::network("reset").retryable);
        assert!(PaymentError::new(PaymentErrorCode::ProviderError, "503").retryable);
        assert!(!PaymentError::new(PaymentErrorCode::InvalidRequest, "bad").retryable);
        assert!(!PaymentError::new(PaymentErrorCode::RateLimited, "429").retryable);
        assert!(!PaymentError::invalid_response("html").retryable);
    }

    #[test]
    fn display_includes_code() {
        let err = PaymentError::network("connection refused");
        assert_eq!(err.to_string(), "network_error: connection refused");
    }
}
