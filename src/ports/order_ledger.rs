//! Order ledger port.
//!
//! Durable record of every checkout attempt and the single point of
//! concurrency control for payment confirmation.
//!
//! # Contract
//!
//! - `mark_completed` / `mark_failed` are compare-and-set on `pending`.
//!   Exactly one caller observes `Applied`; every other caller, including
//!   the loser of a race, observes `AlreadyApplied` with the stored record.
//! - Reaching the *other* terminal state fails with `InvalidTransition`.
//! - No side effects beyond the order record.

use async_trait::async_trait;

use crate::domain::billing::{
    Currency, LedgerError, Order, OrderSubject, PaymentProvider, TransitionOutcome,
};
use crate::domain::foundation::{OrderId, Timestamp, UserId};

#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Creates a new pending order with a placeholder transaction id.
    async fn create_order(
        &self,
        subject: OrderSubject,
        provider: PaymentProvider,
        amount: i64,
        currency: Currency,
    ) -> Result<Order, LedgerError>;

    /// Returns `None` if no order has this id.
    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, LedgerError>;

    /// Looks an order up by the provider's own transaction reference.
    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Order>, LedgerError>;

    /// Transitions `pending → completed`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `InvalidTransition` if the order already failed
    async fn mark_completed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError>;

    /// Transitions `pending → failed`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `InvalidTransition` if the order already completed
    async fn mark_failed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError>;

    /// Records the provider's transaction reference.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `NotPending` once the order is terminal
    async fn update_provider_transaction_id(
        &self,
        id: &OrderId,
        transaction_id: &str,
    ) -> Result<Order, LedgerError>;

    /// Orders of one provider created within `[from, to]`, oldest first.
    async fn list_by_provider_between(
        &self,
        provider: PaymentProvider,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Order>, LedgerError>;

    /// A user's orders, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, LedgerError>;
}
