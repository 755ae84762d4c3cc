//! Stripe webhook errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject a webhook delivery.
///
/// Business outcomes (unknown order, replayed event, ignored type) are not
/// errors: they are acknowledged with 200 so Stripe stops redelivering.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the accepted window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Ledger or entitlement store failure. Stripe will retry.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Infrastructure(_))
    }

    /// Returns true for failures of the signature check.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// 4xx stops Stripe retrying; 5xx asks it to try again.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidTimestamp | WebhookError::ParseError(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_unauthorized_and_final() {
        for err in [WebhookError::MissingSignature, WebhookError::InvalidSignature] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.is_authentication_failure());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn parse_errors_are_bad_requests() {
        let err = WebhookError::ParseError("expected value".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Parse error: expected value");
    }

    #[test]
    fn infrastructure_errors_ask_for_redelivery() {
        let err = WebhookError::Infrastructure("pool timed out".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }
}
