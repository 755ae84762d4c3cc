//! HandleStripeWebhookHandler - confirms Stripe Checkout payments.

use std::sync::Arc;

use super::EntitlementGrantor;
use crate::domain::billing::{LedgerError, TransitionOutcome};
use crate::domain::foundation::OrderId;
use crate::domain::gateway::stripe::{
    CheckoutSessionObject, StripeEvent, StripeEventType, StripeWebhookVerifier, WebhookError,
};
use crate::ports::OrderLedger;

/// Command carrying one webhook delivery exactly as received.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    /// Raw request body; the signature covers these exact bytes.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header, if present.
    pub signature: Option<String>,
}

/// What the delivery did. Every variant is acknowledged with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeWebhookOutcome {
    /// This delivery completed the order.
    Completed { order_id: OrderId, granted: bool },
    /// The order was already in the state the event asks for.
    AlreadyProcessed { order_id: OrderId },
    /// The session expired or its async payment failed.
    Failed { order_id: OrderId },
    /// The event references an order this service does not know.
    UnknownOrder { reference: String },
    Ignored { reason: String },
}

pub struct HandleStripeWebhookHandler {
    verifier: StripeWebhookVerifier,
    ledger: Arc<dyn OrderLedger>,
    grantor: Arc<EntitlementGrantor>,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        verifier: StripeWebhookVerifier,
        ledger: Arc<dyn OrderLedger>,
        grantor: Arc<EntitlementGrantor>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            grantor,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<StripeWebhookOutcome, WebhookError> {
        // 1. Authenticate before touching the ledger
        let signature = cmd.signature.as_deref().ok_or(WebhookError::MissingSignature)?;
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected Stripe webhook");
                e
            })?;

        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook verified");

        // 2. Dispatch
        match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted
            | StripeEventType::CheckoutSessionAsyncPaymentSucceeded => {
                self.handle_paid(&event).await
            }
            StripeEventType::CheckoutSessionExpired
            | StripeEventType::CheckoutSessionAsyncPaymentFailed => {
                self.handle_unpaid(&event).await
            }
            StripeEventType::Unknown => Ok(StripeWebhookOutcome::Ignored {
                reason: format!("unhandled event type {}", event.event_type),
            }),
        }
    }

    async fn handle_paid(&self, event: &StripeEvent) -> Result<StripeWebhookOutcome, WebhookError> {
        let session = session_object(event)?;

        if !session.is_paid() {
            // Delayed methods settle later via async_payment_succeeded.
            return Ok(StripeWebhookOutcome::Ignored {
                reason: format!(
                    "session {} not paid ({})",
                    session.id,
                    session.payment_status.as_deref().unwrap_or("unknown")
                ),
            });
        }

        let order_id = match resolve_order(event, &session) {
            Ok(id) => id,
            Err(outcome) => return Ok(outcome),
        };

        match self.ledger.mark_completed(&order_id).await {
            Ok(TransitionOutcome::Applied(order)) => {
                let granted = self.grantor.grant_after_payment(&order).await;
                tracing::info!(order_id = %order.id, event_id = %event.id, "Stripe payment completed");
                Ok(StripeWebhookOutcome::Completed { order_id, granted })
            }
            Ok(TransitionOutcome::AlreadyApplied(_)) => {
                tracing::info!(order_id = %order_id, event_id = %event.id, "Stripe replay for completed order");
                Ok(StripeWebhookOutcome::AlreadyProcessed { order_id })
            }
            Err(LedgerError::NotFound(_)) => Ok(unknown_order(event, order_id.to_string())),
            Err(LedgerError::InvalidTransition { from, .. }) => {
                // Paid after the session had been failed; needs a refund by hand.
                tracing::error!(order_id = %order_id, event_id = %event.id, status = %from, "Stripe reports payment for a closed order");
                Ok(StripeWebhookOutcome::AlreadyProcessed { order_id })
            }
            Err(e) => Err(infrastructure(e)),
        }
    }

    async fn handle_unpaid(
        &self,
        event: &StripeEvent,
    ) -> Result<StripeWebhookOutcome, WebhookError> {
        let session = session_object(event)?;
        let order_id = match resolve_order(event, &session) {
            Ok(id) => id,
            Err(outcome) => return Ok(outcome),
        };

        match self.ledger.mark_failed(&order_id).await {
            Ok(TransitionOutcome::Applied(_)) => {
                tracing::info!(order_id = %order_id, event_type = %event.event_type, "Stripe checkout failed");
                Ok(StripeWebhookOutcome::Failed { order_id })
            }
            Ok(TransitionOutcome::AlreadyApplied(_)) => {
                Ok(StripeWebhookOutcome::AlreadyProcessed { order_id })
            }
            Err(LedgerError::InvalidTransition { .. }) => {
                tracing::info!(order_id = %order_id, event_type = %event.event_type, "Ignoring failure event for completed order");
                Ok(StripeWebhookOutcome::AlreadyProcessed { order_id })
            }
            Err(LedgerError::NotFound(_)) => Ok(unknown_order(event, order_id.to_string())),
            Err(e) => Err(infrastructure(e)),
        }
    }
}

fn session_object(event: &StripeEvent) -> Result<CheckoutSessionObject, WebhookError> {
    event
        .deserialize_object()
        .map_err(|e| WebhookError::ParseError(format!("checkout session: {}", e)))
}

fn resolve_order(
    event: &StripeEvent,
    session: &CheckoutSessionObject,
) -> Result<OrderId, StripeWebhookOutcome> {
    let Some(reference) = session.order_reference() else {
        tracing::warn!(event_id = %event.id, session_id = %session.id, "Stripe session carries no order reference");
        return Err(StripeWebhookOutcome::Ignored {
            reason: format!("session {} has no order reference", session.id),
        });
    };
    reference
        .parse()
        .map_err(|_| unknown_order(event, reference.to_string()))
}

fn unknown_order(event: &StripeEvent, reference: String) -> StripeWebhookOutcome {
    tracing::warn!(event_id = %event.id, reference = %reference, "Stripe event for unknown order");
    StripeWebhookOutcome::UnknownOrder { reference }
}

fn infrastructure(err: LedgerError) -> WebhookError {
    tracing::error!(error = %err, "Ledger failure while handling Stripe webhook");
    WebhookError::Infrastructure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryEntitlementStore, InMemoryOrderLedger};
    use crate::domain::billing::{Currency, Order, OrderStatus, OrderSubject, PaymentProvider};
    use crate::domain::foundation::{CourseId, Timestamp, UserId};
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    struct Fixture {
        ledger: Arc<InMemoryOrderLedger>,
        store: Arc<InMemoryEntitlementStore>,
        handler: HandleStripeWebhookHandler,
    }

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let store = Arc::new(InMemoryEntitlementStore::new());
        let grantor = Arc::new(EntitlementGrantor::new(
            store.clone(),
            Arc::new(InMemoryCatalog::new()),
        ));
        let handler = HandleStripeWebhookHandler::new(verifier(), ledger.clone(), grantor);
        Fixture {
            ledger,
            store,
            handler,
        }
    }

    fn course_order(ledger: &InMemoryOrderLedger) -> Order {
        let order = Order::new_pending(
            OrderSubject::Course {
                user_id: UserId::new("student-1").unwrap(),
                course_id: CourseId::new("rust-101").unwrap(),
            },
            PaymentProvider::Stripe,
            125_000,
            Currency::Uzs,
            Timestamp::now(),
        );
        ledger.insert(order.clone());
        order
    }

    fn signed(event_type: &str, object: serde_json::Value) -> HandleStripeWebhookCommand {
        let payload = json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_704_067_200,
            "data": { "object": object }
        })
        .to_string();
        let now = chrono::Utc::now().timestamp();
        let signature = format!("t={},v1={}", now, verifier().sign(now, payload.as_bytes()));
        HandleStripeWebhookCommand {
            payload: payload.into_bytes(),
            signature: Some(signature),
        }
    }

    fn paid_session(order_id: &str) -> serde_json::Value {
        json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "metadata": { "order_id": order_id }
        })
    }

    fn student_course() -> (UserId, CourseId) {
        (
            UserId::new("student-1").unwrap(),
            CourseId::new("rust-101").unwrap(),
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authentication
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn forged_signature_is_rejected_before_ledger_access() {
        let f = fixture();
        let order = course_order(&f.ledger);
        let mut cmd = signed("checkout.session.completed", paid_session(&order.id.to_string()));
        cmd.signature = Some(format!("t={},v1={}", chrono::Utc::now().timestamp(), "0".repeat(64)));

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert_eq!(f.ledger.read_count(), 0);
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let f = fixture();
        let mut cmd = signed("checkout.session.completed", paid_session("x"));
        cmd.signature = None;

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Completion
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_session_completes_order_and_enrolls_once() {
        let f = fixture();
        let order = course_order(&f.ledger);
        let cmd = signed("checkout.session.completed", paid_session(&order.id.to_string()));

        let first = f.handler.handle(cmd.clone()).await.unwrap();
        let replay = f.handler.handle(cmd).await.unwrap();

        assert_eq!(
            first,
            StripeWebhookOutcome::Completed {
                order_id: order.id,
                granted: true
            }
        );
        assert_eq!(
            replay,
            StripeWebhookOutcome::AlreadyProcessed { order_id: order.id }
        );
        let (user, course) = student_course();
        assert_eq!(f.store.enrollment_count(&user, &course), 1);
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn unpaid_session_is_ignored() {
        let f = fixture();
        let order = course_order(&f.ledger);
        let object = json!({
            "id": "cs_test_1",
            "payment_status": "unpaid",
            "metadata": { "order_id": order.id.to_string() }
        });

        let outcome = f
            .handler
            .handle(signed("checkout.session.completed", object))
            .await
            .unwrap();

        assert!(matches!(outcome, StripeWebhookOutcome::Ignored { .. }));
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let f = fixture();
        let stranger = OrderId::new().to_string();

        let outcome = f
            .handler
            .handle(signed("checkout.session.completed", paid_session(&stranger)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StripeWebhookOutcome::UnknownOrder {
                reference: stranger
            }
        );
        assert_eq!(f.store.total_enrollments(), 0);
    }

    #[tokio::test]
    async fn unparseable_reference_is_an_unknown_order() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(signed("checkout.session.completed", paid_session("order-42")))
            .await
            .unwrap();
        assert!(matches!(outcome, StripeWebhookOutcome::UnknownOrder { .. }));
    }

    #[tokio::test]
    async fn ledger_outage_is_retryable() {
        let f = fixture();
        let order = course_order(&f.ledger);
        f.ledger.set_unavailable(true);

        let err = f
            .handler
            .handle(signed("checkout.session.completed", paid_session(&order.id.to_string())))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure and other events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expired_session_fails_pending_order() {
        let f = fixture();
        let order = course_order(&f.ledger);
        let object = json!({
            "id": "cs_test_1",
            "payment_status": "unpaid",
            "client_reference_id": order.id.to_string()
        });

        let outcome = f
            .handler
            .handle(signed("checkout.session.expired", object))
            .await
            .unwrap();

        assert_eq!(outcome, StripeWebhookOutcome::Failed { order_id: order.id });
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn expiry_after_completion_is_acknowledged() {
        let f = fixture();
        let order = course_order(&f.ledger);
        f.handler
            .handle(signed("checkout.session.completed", paid_session(&order.id.to_string())))
            .await
            .unwrap();

        let outcome = f
            .handler
            .handle(signed("checkout.session.expired", paid_session(&order.id.to_string())))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StripeWebhookOutcome::AlreadyProcessed { order_id: order.id }
        );
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn unrelated_event_types_are_ignored() {
        let f = fixture();
        let outcome = f
            .handler
            .handle(signed("customer.created", json!({ "id": "cus_1" })))
            .await
            .unwrap();
        assert!(matches!(outcome, StripeWebhookOutcome::Ignored { .. }));
        assert_eq!(f.ledger.read_count(), 0);
    }
}
