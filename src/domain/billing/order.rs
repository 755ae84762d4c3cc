//! Order aggregate.
//!
//! # Design Decisions
//!
//! - **Whole units**: `amount` is whole sum/dollars; adapters convert to
//!   tiyin or cents at the wire.
//! - **Placeholder reference**: a fresh order carries a locally generated
//!   transaction id until the provider issues its own.
//! - **Transition timestamps**: `completed_at`/`failed_at` are written once,
//!   so replays can answer with the originally recorded time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, LedgerError, OrderStatus, PaymentProvider};
use crate::domain::entitlement::InstructorPlan;
use crate::domain::foundation::{CourseId, OrderId, StateMachine, Timestamp, UserId};

/// What an order pays for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderSubject {
    /// A single course purchase.
    Course { user_id: UserId, course_id: CourseId },
    /// A period of an instructor plan.
    Subscription { user_id: UserId, plan: InstructorPlan },
}

impl OrderSubject {
    pub fn user_id(&self) -> &UserId {
        match self {
            OrderSubject::Course { user_id, .. } | OrderSubject::Subscription { user_id, .. } => {
                user_id
            }
        }
    }

    pub fn kind(&self) -> OrderKind {
        match self {
            OrderSubject::Course { .. } => OrderKind::CoursePurchase,
            OrderSubject::Subscription { .. } => OrderKind::SubscriptionPayment,
        }
    }
}

/// Concrete order kind; each kind is persisted in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    CoursePurchase,
    SubscriptionPayment,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::CoursePurchase => "course_purchase",
            OrderKind::SubscriptionPayment => "subscription_payment",
        }
    }
}

const PLACEHOLDER_PREFIX: &str = "local_";

/// Builds a local transaction reference: `local_<unix-millis>_<16 hex>`.
///
/// The random suffix keeps references unique for orders created in the
/// same millisecond.
pub fn placeholder_transaction_id(now: Timestamp) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", PLACEHOLDER_PREFIX, now.as_unix_millis(), &random[..16])
}

/// A persisted intent to pay for a course or an instructor plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub subject: OrderSubject,
    pub provider: PaymentProvider,
    /// Whole units of `currency`.
    pub amount: i64,
    pub currency: Currency,
    /// Placeholder until the provider assigns its own reference.
    pub transaction_id: String,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
}

impl Order {
    /// Creates a pending order with a placeholder transaction id.
    pub fn new_pending(
        subject: OrderSubject,
        provider: PaymentProvider,
        amount: i64,
        currency: Currency,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OrderId::new(),
            subject,
            provider,
            amount,
            currency,
            transaction_id: placeholder_transaction_id(now),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        self.subject.user_id()
    }

    pub fn kind(&self) -> OrderKind {
        self.subject.kind()
    }

    /// True once a provider has replaced the placeholder reference.
    pub fn has_provider_reference(&self) -> bool {
        !self.transaction_id.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == OrderStatus::Failed
    }

    /// Moves a pending order to `completed`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the order is already terminal.
    pub fn complete(&mut self, at: Timestamp) -> Result<(), LedgerError> {
        self.status = self.checked_transition(OrderStatus::Completed)?;
        self.completed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Moves a pending order to `failed`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the order is already terminal.
    pub fn fail(&mut self, at: Timestamp) -> Result<(), LedgerError> {
        self.status = self.checked_transition(OrderStatus::Failed)?;
        self.failed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Replaces the transaction reference with the provider's own.
    ///
    /// # Errors
    ///
    /// `NotPending` once the order has reached a terminal state.
    pub fn attach_provider_transaction(
        &mut self,
        transaction_id: impl Into<String>,
        at: Timestamp,
    ) -> Result<(), LedgerError> {
        if !self.is_pending() {
            return Err(LedgerError::NotPending(self.id));
        }
        self.transaction_id = transaction_id.into();
        self.updated_at = at;
        Ok(())
    }

    fn checked_transition(&self, target: OrderStatus) -> Result<OrderStatus, LedgerError> {
        self.status
            .transition_to(target)
            .map_err(|_| LedgerError::InvalidTransition {
                from: self.status,
                to: target,
            })
    }
}

/// Result of a `pending → terminal` transition request.
///
/// `Applied` means this call moved the order; `AlreadyApplied` means the
/// order was already in the requested state and is returned untouched.
/// Adapters grant entitlements only on `Applied`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(Order),
    AlreadyApplied(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::AlreadyApplied(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::AlreadyApplied(order) => order,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_subject() -> OrderSubject {
        OrderSubject::Course {
            user_id: UserId::new("user-1").unwrap(),
            course_id: CourseId::new("course-1").unwrap(),
        }
    }

    fn pending_order() -> Order {
        Order::new_pending(
            course_subject(),
            PaymentProvider::Click,
            100_000,
            Currency::Uzs,
            Timestamp::now(),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Construction
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn new_order_is_pending_with_placeholder_reference() {
        let order = pending_order();
        assert!(order.is_pending());
        assert!(order.transaction_id.starts_with("local_"));
        assert!(!order.has_provider_reference());
        assert!(order.completed_at.is_none());
        assert!(order.failed_at.is_none());
        assert_eq!(order.kind(), OrderKind::CoursePurchase);
    }

    #[test]
    fn placeholder_has_millis_and_sixteen_hex_chars() {
        let now = Timestamp::from_unix_millis(1_700_000_000_123).unwrap();
        let id = placeholder_transaction_id(now);
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "local");
        assert_eq!(parts[1], "1700000000123");
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn placeholders_created_together_are_distinct() {
        let now = Timestamp::now();
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| placeholder_transaction_id(now)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn subscription_subject_reports_kind_and_user() {
        let subject = OrderSubject::Subscription {
            user_id: UserId::new("inst-1").unwrap(),
            plan: InstructorPlan::Pro,
        };
        assert_eq!(subject.kind(), OrderKind::SubscriptionPayment);
        assert_eq!(subject.user_id().as_str(), "inst-1");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn complete_records_completion_time() {
        let mut order = pending_order();
        let at = Timestamp::now();
        order.complete(at).unwrap();

        assert!(order.is_completed());
        assert_eq!(order.completed_at, Some(at));
        assert_eq!(order.updated_at, at);
    }

    #[test]
    fn failed_order_cannot_complete() {
        let mut order = pending_order();
        order.fail(Timestamp::now()).unwrap();

        let err = order.complete(Timestamp::now()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidTransition {
                from: OrderStatus::Failed,
                to: OrderStatus::Completed
            }
        );
        assert!(order.completed_at.is_none());
    }

    #[test]
    fn completed_order_keeps_its_reference() {
        let mut order = pending_order();
        order.attach_provider_transaction("payme-1", Timestamp::now()).unwrap();
        assert!(order.has_provider_reference());
        order.complete(Timestamp::now()).unwrap();

        let err = order
            .attach_provider_transaction("payme-2", Timestamp::now())
            .unwrap_err();
        assert_eq!(err, LedgerError::NotPending(order.id));
        assert_eq!(order.transaction_id, "payme-1");
    }

    #[test]
    fn outcome_exposes_order_either_way() {
        let order = pending_order();
        let applied = TransitionOutcome::Applied(order.clone());
        let replay = TransitionOutcome::AlreadyApplied(order.clone());

        assert!(applied.was_applied());
        assert!(!replay.was_applied());
        assert_eq!(replay.order().id, order.id);
        assert_eq!(applied.into_order(), order);
    }
}
