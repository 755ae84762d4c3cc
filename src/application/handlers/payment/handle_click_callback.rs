//! ClickCallbackHandler - prepare/complete callbacks from Click.
//!
//! Business failures travel back as `error` codes inside a normal reply.
//! Only infrastructure failures surface as `Err`, so Click retries.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;

use super::EntitlementGrantor;
use crate::domain::billing::{LedgerError, Order, PaymentProvider, TransitionOutcome};
use crate::domain::foundation::OrderId;
use crate::domain::gateway::click::{ClickAction, ClickErrorCode, ClickRequest, ClickResponse};
use crate::ports::OrderLedger;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClickCallbackError {
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<LedgerError> for ClickCallbackError {
    fn from(err: LedgerError) -> Self {
        tracing::error!(error = %err, "Ledger failure while handling Click callback");
        ClickCallbackError::Infrastructure(err.to_string())
    }
}

pub struct ClickCallbackHandler {
    secret: SecretString,
    service_id: String,
    ledger: Arc<dyn OrderLedger>,
    grantor: Arc<EntitlementGrantor>,
}

impl ClickCallbackHandler {
    pub fn new(
        secret: SecretString,
        service_id: impl Into<String>,
        ledger: Arc<dyn OrderLedger>,
        grantor: Arc<EntitlementGrantor>,
    ) -> Self {
        Self {
            secret,
            service_id: service_id.into(),
            ledger,
            grantor,
        }
    }

    pub async fn handle(&self, request: ClickRequest) -> Result<ClickResponse, ClickCallbackError> {
        // 1. Signature before anything else
        if !request.signature_matches(self.secret.expose_secret()) {
            tracing::warn!(
                click_trans_id = %request.click_trans_id,
                merchant_trans_id = %request.merchant_trans_id,
                "Click callback with invalid signature"
            );
            return Ok(reply(&request, ClickErrorCode::SignFailed));
        }
        if request.service_id.trim() != self.service_id {
            tracing::warn!(service_id = %request.service_id, "Click callback for another service");
            return Ok(reply(&request, ClickErrorCode::RequestError));
        }

        let action = request.action();
        if let ClickAction::Unknown(code) = &action {
            tracing::warn!(action = %code, "Unknown Click action");
            return Ok(reply(&request, ClickErrorCode::ActionNotFound));
        }

        // 2. Resolve the order
        let Some(order) = self.find_order(&request).await? else {
            tracing::warn!(merchant_trans_id = %request.merchant_trans_id, "Click callback for unknown order");
            return Ok(reply(&request, ClickErrorCode::OrderNotFound));
        };
        let Some(amount) = request.amount() else {
            return Ok(reply(&request, ClickErrorCode::IncorrectAmount));
        };

        match action {
            ClickAction::Prepare => self.prepare(&request, order, amount).await,
            ClickAction::Complete => self.complete(&request, order, amount).await,
            ClickAction::Unknown(_) => Ok(reply(&request, ClickErrorCode::ActionNotFound)),
        }
    }

    async fn prepare(
        &self,
        request: &ClickRequest,
        order: Order,
        amount: Decimal,
    ) -> Result<ClickResponse, ClickCallbackError> {
        if order.is_completed() {
            return Ok(reply(request, ClickErrorCode::AlreadyPaid));
        }
        if order.is_failed() {
            return Ok(reply(request, ClickErrorCode::TransactionCancelled));
        }
        if !amount_matches(&order, amount) {
            return Ok(reply(request, ClickErrorCode::IncorrectAmount));
        }

        match self
            .ledger
            .update_provider_transaction_id(&order.id, &request.click_trans_id)
            .await
        {
            Ok(order) => {
                tracing::info!(order_id = %order.id, click_trans_id = %request.click_trans_id, "Click payment prepared");
                Ok(ClickResponse::prepared(request, order.id.to_string()))
            }
            Err(LedgerError::NotPending(_)) => Ok(reply(request, ClickErrorCode::AlreadyPaid)),
            Err(LedgerError::NotFound(_)) => Ok(reply(request, ClickErrorCode::OrderNotFound)),
            Err(e) => Err(e.into()),
        }
    }

    async fn complete(
        &self,
        request: &ClickRequest,
        order: Order,
        amount: Decimal,
    ) -> Result<ClickResponse, ClickCallbackError> {
        if order.is_completed() {
            return Ok(ClickResponse::confirmed(request, order.id.to_string()));
        }
        if order.is_failed() {
            return Ok(reply(request, ClickErrorCode::TransactionCancelled));
        }

        let prepared_for_this = request
            .merchant_prepare_id
            .as_deref()
            .map(|id| id.trim() == order.id.to_string())
            .unwrap_or(false)
            && order.transaction_id == request.click_trans_id;
        if !prepared_for_this {
            tracing::warn!(
                order_id = %order.id,
                click_trans_id = %request.click_trans_id,
                "Click complete without matching prepare"
            );
            return Ok(reply(request, ClickErrorCode::TransactionNotFound));
        }
        if request.reports_failure() {
            // Click aborted the payment on its side.
            return match self.ledger.mark_failed(&order.id).await {
                Ok(_) => {
                    tracing::info!(
                        order_id = %order.id,
                        click_error = request.error.as_deref().unwrap_or_default(),
                        "Click payment aborted"
                    );
                    Ok(reply(request, ClickErrorCode::TransactionCancelled))
                }
                Err(LedgerError::InvalidTransition { .. }) => {
                    Ok(ClickResponse::confirmed(request, order.id.to_string()))
                }
                Err(e) => Err(e.into()),
            };
        }

        if !amount_matches(&order, amount) {
            return Ok(reply(request, ClickErrorCode::IncorrectAmount));
        }

        match self.ledger.mark_completed(&order.id).await {
            Ok(TransitionOutcome::Applied(order)) => {
                self.grantor.grant_after_payment(&order).await;
                tracing::info!(order_id = %order.id, click_trans_id = %request.click_trans_id, "Click payment completed");
                Ok(ClickResponse::confirmed(request, order.id.to_string()))
            }
            Ok(TransitionOutcome::AlreadyApplied(order)) => {
                Ok(ClickResponse::confirmed(request, order.id.to_string()))
            }
            Err(LedgerError::InvalidTransition { .. }) => {
                Ok(reply(request, ClickErrorCode::TransactionCancelled))
            }
            Err(LedgerError::NotFound(_)) => Ok(reply(request, ClickErrorCode::OrderNotFound)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_order(&self, request: &ClickRequest) -> Result<Option<Order>, ClickCallbackError> {
        let Ok(order_id) = request.merchant_trans_id.parse::<OrderId>() else {
            return Ok(None);
        };
        let order = self.ledger.find_order(&order_id).await?;
        Ok(order.filter(|o| o.provider == PaymentProvider::Click))
    }
}

fn amount_matches(order: &Order, amount: Decimal) -> bool {
    let expected = Decimal::from(order.amount);
    if expected != amount {
        tracing::warn!(
            order_id = %order.id,
            expected = %expected,
            received = %amount,
            "Click amount mismatch"
        );
        return false;
    }
    true
}

fn reply(request: &ClickRequest, code: ClickErrorCode) -> ClickResponse {
    ClickResponse::error(request, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryEntitlementStore, InMemoryOrderLedger};
    use crate::domain::billing::{Currency, OrderStatus, OrderSubject};
    use crate::domain::entitlement::{InstructorPlan, UserRole};
    use crate::domain::foundation::{Timestamp, UserId};

    const SECRET: &str = "click-secret";
    const SERVICE_ID: &str = "20017";

    struct Fixture {
        ledger: Arc<InMemoryOrderLedger>,
        store: Arc<InMemoryEntitlementStore>,
        users: Arc<InMemoryCatalog>,
        handler: ClickCallbackHandler,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let store = Arc::new(InMemoryEntitlementStore::new());
        let users = Arc::new(InMemoryCatalog::new());
        let grantor = Arc::new(EntitlementGrantor::new(store.clone(), users.clone()));
        let handler = ClickCallbackHandler::new(
            SecretString::new(SECRET.to_string()),
            SERVICE_ID,
            ledger.clone(),
            grantor,
        );
        Fixture {
            ledger,
            store,
            users,
            handler,
        }
    }

    fn subscription_order(f: &Fixture) -> Order {
        let user_id = f.users.add_user("inst-1", "Ali Valiyev", UserRole::Student);
        let order = Order::new_pending(
            OrderSubject::Subscription {
                user_id,
                plan: InstructorPlan::Pro,
            },
            PaymentProvider::Click,
            249_000,
            Currency::Uzs,
            Timestamp::now(),
        );
        f.ledger.insert(order.clone());
        order
    }

    fn signed(mut request: ClickRequest) -> ClickRequest {
        request.sign_string = request.expected_signature(SECRET);
        request
    }

    fn prepare(order: &Order, amount: &str) -> ClickRequest {
        signed(ClickRequest {
            click_trans_id: "9001".to_string(),
            service_id: SERVICE_ID.to_string(),
            merchant_trans_id: order.id.to_string(),
            amount: amount.to_string(),
            action: "0".to_string(),
            sign_time: "2024-01-01 10:00:00".to_string(),
            ..Default::default()
        })
    }

    fn complete(order: &Order, amount: &str, error: Option<&str>) -> ClickRequest {
        signed(ClickRequest {
            click_trans_id: "9001".to_string(),
            service_id: SERVICE_ID.to_string(),
            merchant_trans_id: order.id.to_string(),
            merchant_prepare_id: Some(order.id.to_string()),
            amount: amount.to_string(),
            action: "1".to_string(),
            error: error.map(str::to_string),
            sign_time: "2024-01-01 10:00:05".to_string(),
            ..Default::default()
        })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bad_signature_is_reported_as_data() {
        let f = fixture();
        let order = subscription_order(&f);
        let mut request = prepare(&order, "249000.00");
        request.sign_string = "0".repeat(32);

        let response = f.handler.handle(request).await.unwrap();

        assert_eq!(response.error, -1);
        assert_eq!(f.ledger.read_count(), 0);
    }

    #[tokio::test]
    async fn unknown_action_and_order_are_reported() {
        let f = fixture();
        let order = subscription_order(&f);

        let mut odd = prepare(&order, "249000");
        odd.action = "7".to_string();
        let odd = signed(odd);
        assert_eq!(f.handler.handle(odd).await.unwrap().error, -3);

        let mut stranger = prepare(&order, "249000");
        stranger.merchant_trans_id = OrderId::new().to_string();
        let stranger = signed(stranger);
        assert_eq!(f.handler.handle(stranger).await.unwrap().error, -5);
    }

    #[tokio::test]
    async fn prepare_rejects_wrong_amount() {
        let f = fixture();
        let order = subscription_order(&f);
        let response = f.handler.handle(prepare(&order, "1000")).await.unwrap();
        assert_eq!(response.error, -2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Prepare → complete
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn prepare_then_complete_grants_plan_once() {
        let f = fixture();
        let order = subscription_order(&f);

        let prepared = f.handler.handle(prepare(&order, "249000.00")).await.unwrap();
        assert!(prepared.is_success());
        assert_eq!(prepared.merchant_prepare_id, Some(order.id.to_string()));

        let done = f
            .handler
            .handle(complete(&order, "249000.00", None))
            .await
            .unwrap();
        let replay = f
            .handler
            .handle(complete(&order, "249000.00", None))
            .await
            .unwrap();

        assert!(done.is_success());
        assert_eq!(done.merchant_confirm_id, Some(order.id.to_string()));
        assert_eq!(done, replay);
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Completed);

        let user = UserId::new("inst-1").unwrap();
        assert_eq!(f.store.subscription_count(), 1);
        assert_eq!(f.users.role_of(&user), Some(UserRole::Instructor));
    }

    #[tokio::test]
    async fn prepare_after_completion_is_already_paid() {
        let f = fixture();
        let order = subscription_order(&f);
        f.handler.handle(prepare(&order, "249000")).await.unwrap();
        f.handler.handle(complete(&order, "249000", None)).await.unwrap();

        let response = f.handler.handle(prepare(&order, "249000")).await.unwrap();
        assert_eq!(response.error, -4);
    }

    #[tokio::test]
    async fn complete_without_prepare_is_transaction_not_found() {
        let f = fixture();
        let order = subscription_order(&f);
        let response = f
            .handler
            .handle(complete(&order, "249000", None))
            .await
            .unwrap();
        assert_eq!(response.error, -6);
        assert!(f.ledger.get(&order.id).unwrap().is_pending());
    }

    #[tokio::test]
    async fn aborted_payment_fails_order() {
        let f = fixture();
        let order = subscription_order(&f);
        f.handler.handle(prepare(&order, "249000")).await.unwrap();

        let response = f
            .handler
            .handle(complete(&order, "249000", Some("-5017")))
            .await
            .unwrap();

        assert_eq!(response.error, -9);
        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Failed);
        assert_eq!(f.store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn abort_without_matching_prepare_leaves_order_pending() {
        let f = fixture();
        let order = subscription_order(&f);

        let unprepared = f
            .handler
            .handle(complete(&order, "249000", Some("-5017")))
            .await
            .unwrap();
        assert_eq!(unprepared.error, -6);

        f.handler.handle(prepare(&order, "249000")).await.unwrap();
        let mut foreign = complete(&order, "249000", Some("-5017"));
        foreign.click_trans_id = "9002".to_string();
        let foreign = signed(foreign);
        assert_eq!(f.handler.handle(foreign).await.unwrap().error, -6);

        assert_eq!(f.ledger.get(&order.id).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn ledger_outage_is_an_error() {
        let f = fixture();
        let order = subscription_order(&f);
        f.ledger.set_unavailable(true);

        let result = f.handler.handle(prepare(&order, "249000")).await;
        assert!(matches!(result, Err(ClickCallbackError::Infrastructure(_))));
    }
}
