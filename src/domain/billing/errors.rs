//! Order ledger errors.

use thiserror::Error;

use super::OrderStatus;
use crate::domain::foundation::{DomainError, ErrorCode, OrderId};

/// Failures reported by the order ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order is already in a terminal state that forbids the transition.
    #[error("Cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Provider references can only be rewritten while the order is pending.
    #[error("Order {0} is no longer pending")]
    NotPending(OrderId),

    #[error("Ledger infrastructure error: {0}")]
    Infrastructure(String),
}

impl LedgerError {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        LedgerError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::NotFound(_) => ErrorCode::OrderNotFound,
            LedgerError::InvalidTransition { .. } | LedgerError::NotPending(_) => {
                ErrorCode::InvalidStateTransition
            }
            LedgerError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        LedgerError::Infrastructure(err.to_string())
    }
}

impl From<LedgerError> for DomainError {
    fn from(err: LedgerError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
