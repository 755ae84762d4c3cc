//! In-memory order ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::domain::billing::{
    Currency, LedgerError, Order, OrderStatus, OrderSubject, PaymentProvider, TransitionOutcome,
};
use crate::domain::foundation::{OrderId, Timestamp, UserId};
use crate::ports::OrderLedger;

/// Order ledger backed by a `HashMap`.
///
/// Transitions run under the write lock, which gives the same
/// compare-and-set guarantee as the conditional SQL update.
#[derive(Default)]
pub struct InMemoryOrderLedger {
    orders: RwLock<HashMap<OrderId, Order>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Stores an order as-is, bypassing `create_order`.
    pub fn insert(&self, order: Order) {
        self.orders
            .write()
            .expect("InMemoryOrderLedger: orders lock poisoned")
            .insert(order.id, order);
    }

    /// Returns a snapshot of an order without counting it as a read.
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders
            .read()
            .expect("InMemoryOrderLedger: orders lock poisoned")
            .get(id)
            .cloned()
    }

    /// Number of lookups served through the port.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes every port call fail with an infrastructure error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::infrastructure("ledger unavailable"));
        }
        Ok(())
    }

    fn transition(
        &self,
        id: &OrderId,
        target: OrderStatus,
    ) -> Result<TransitionOutcome, LedgerError> {
        self.check_available()?;
        let mut orders = self
            .orders
            .write()
            .expect("InMemoryOrderLedger: orders lock poisoned");
        let order = orders.get_mut(id).ok_or(LedgerError::NotFound(*id))?;

        if order.status == target {
            return Ok(TransitionOutcome::AlreadyApplied(order.clone()));
        }

        let now = Timestamp::now();
        match target {
            OrderStatus::Completed => order.complete(now)?,
            OrderStatus::Failed => order.fail(now)?,
            OrderStatus::Pending => {
                return Err(LedgerError::InvalidTransition {
                    from: order.status,
                    to: target,
                })
            }
        }
        Ok(TransitionOutcome::Applied(order.clone()))
    }
}

#[async_trait]
impl OrderLedger for InMemoryOrderLedger {
    async fn create_order(
        &self,
        subject: OrderSubject,
        provider: PaymentProvider,
        amount: i64,
        currency: Currency,
    ) -> Result<Order, LedgerError> {
        self.check_available()?;
        let order = Order::new_pending(subject, provider, amount, currency, Timestamp::now());
        self.insert(order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, LedgerError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(id))
    }

    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Order>, LedgerError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let orders = self
            .orders
            .read()
            .expect("InMemoryOrderLedger: orders lock poisoned");
        Ok(orders
            .values()
            .find(|o| o.provider == provider && o.transaction_id == transaction_id)
            .cloned())
    }

    async fn mark_completed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError> {
        self.transition(id, OrderStatus::Completed)
    }

    async fn mark_failed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError> {
        self.transition(id, OrderStatus::Failed)
    }

    async fn update_provider_transaction_id(
        &self,
        id: &OrderId,
        transaction_id: &str,
    ) -> Result<Order, LedgerError> {
        self.check_available()?;
        let mut orders = self
            .orders
            .write()
            .expect("InMemoryOrderLedger: orders lock poisoned");
        let order = orders.get_mut(id).ok_or(LedgerError::NotFound(*id))?;
        order.attach_provider_transaction(transaction_id, Timestamp::now())?;
        Ok(order.clone())
    }

    async fn list_by_provider_between(
        &self,
        provider: PaymentProvider,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Order>, LedgerError> {
        self.check_available()?;
        let orders = self
            .orders
            .read()
            .expect("InMemoryOrderLedger: orders lock poisoned");
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.provider == provider && o.created_at >= from && o.created_at <= to)
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.created_at);
        Ok(matching)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, LedgerError> {
        self.check_available()?;
        let orders = self
            .orders
            .read()
            .expect("InMemoryOrderLedger: orders lock poisoned");
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
