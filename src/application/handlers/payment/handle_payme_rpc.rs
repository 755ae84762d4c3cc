//! PaymeRpcHandler - merchant side of the Payme Merchant API.
//!
//! Every outcome, including failures, is a JSON-RPC envelope delivered with
//! HTTP 200. Ledger outages become `-32400` so Payme retries the call.

use serde_json::Value;
use std::sync::Arc;

use super::EntitlementGrantor;
use crate::domain::billing::{LedgerError, Order, PaymentProvider, TransitionOutcome};
use crate::domain::foundation::{OrderId, Timestamp};
use crate::domain::gateway::payme::{
    CancelTransactionParams, CancelTransactionResult, CheckPerformParams, CheckPerformResult,
    CheckTransactionResult, CreateTransactionParams, CreateTransactionResult, GetStatementParams,
    GetStatementResult, PaymeAccount, PaymeCredentials, PaymeError, PaymeMethod, PaymeRequest,
    PaymeResponse, PaymeState, PerformTransactionResult, StatementEntry, TransactionRef,
    TIYIN_PER_UZS,
};
use crate::ports::OrderLedger;

pub struct PaymeRpcHandler {
    credentials: PaymeCredentials,
    ledger: Arc<dyn OrderLedger>,
    grantor: Arc<EntitlementGrantor>,
}

impl PaymeRpcHandler {
    pub fn new(
        credentials: PaymeCredentials,
        ledger: Arc<dyn OrderLedger>,
        grantor: Arc<EntitlementGrantor>,
    ) -> Self {
        Self {
            credentials,
            ledger,
            grantor,
        }
    }

    /// Handles one raw JSON-RPC call.
    pub async fn handle(&self, authorization: Option<&str>, body: &[u8]) -> PaymeResponse {
        let id = request_id(body);

        // 1. Authenticate before anything else
        if !self.credentials.authorize(authorization) {
            tracing::warn!("Payme call with invalid credentials");
            return PaymeResponse::failure(id, PaymeError::insufficient_privilege());
        }

        // 2. Parse the envelope
        let request: PaymeRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable Payme request");
                return PaymeResponse::failure(id, PaymeError::parse_error());
            }
        };
        let Some(method_name) = request.method.as_deref() else {
            return PaymeResponse::failure(id, PaymeError::invalid_request("missing method"));
        };
        let method = PaymeMethod::from_name(method_name);
        tracing::debug!(method = method.as_str(), "Payme call");

        // 3. Dispatch
        let id = request.id.clone();
        let response = match &method {
            PaymeMethod::CheckPerformTransaction => self
                .check_perform(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::CreateTransaction => self
                .create_transaction(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::PerformTransaction => self
                .perform_transaction(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::CancelTransaction => self
                .cancel_transaction(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::CheckTransaction => self
                .check_transaction(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::GetStatement => self
                .get_statement(&request)
                .await
                .map(|r| PaymeResponse::success(id.clone(), r)),
            PaymeMethod::Unknown(name) => Err(PaymeError::method_not_found(name.clone())),
        };

        response.unwrap_or_else(|err| {
            tracing::info!(method = method.as_str(), code = err.code, "Payme call refused");
            PaymeResponse::failure(id, err)
        })
    }

    async fn check_perform(
        &self,
        request: &PaymeRequest,
    ) -> Result<CheckPerformResult, PaymeError> {
        let params: CheckPerformParams = request.params()?;
        let order = self.order_for_account(&params.account).await?;

        if !order.is_pending() {
            return Err(PaymeError::cannot_perform());
        }
        check_amount(&order, params.amount)?;

        Ok(CheckPerformResult { allow: true })
    }

    async fn create_transaction(
        &self,
        request: &PaymeRequest,
    ) -> Result<CreateTransactionResult, PaymeError> {
        let params: CreateTransactionParams = request.params()?;

        // Replay of a transaction we already accepted
        if let Some(order) = self.find_by_transaction(&params.id).await? {
            // Only a still-pending bind replays; performed or cancelled ones are final
            if !order.is_pending() {
                return Err(PaymeError::cannot_perform());
            }
            return Ok(created_descriptor(&order));
        }

        let order = self.order_for_account(&params.account).await?;
        if !order.is_pending() {
            return Err(PaymeError::cannot_perform());
        }
        check_amount(&order, params.amount)?;
        if order.has_provider_reference() {
            // Another Payme transaction is already paying for this order.
            tracing::warn!(
                order_id = %order.id,
                existing = %order.transaction_id,
                incoming = %params.id,
                "Payme order already bound to another transaction"
            );
            return Err(PaymeError::cannot_perform());
        }

        let order = self
            .ledger
            .update_provider_transaction_id(&order.id, &params.id)
            .await
            .map_err(|e| match e {
                LedgerError::NotPending(_) => PaymeError::cannot_perform(),
                LedgerError::NotFound(_) => PaymeError::order_not_found(),
                other => system_error(other),
            })?;

        tracing::info!(order_id = %order.id, payme_id = %params.id, "Payme transaction created");
        Ok(created_descriptor(&order))
    }

    async fn perform_transaction(
        &self,
        request: &PaymeRequest,
    ) -> Result<PerformTransactionResult, PaymeError> {
        let params: TransactionRef = request.params()?;
        let order = self
            .find_by_transaction(&params.id)
            .await?
            .ok_or_else(PaymeError::transaction_not_found)?;

        if order.is_failed() {
            return Err(PaymeError::cannot_perform());
        }
        if order.is_completed() {
            return Ok(performed_descriptor(&order));
        }

        match self.ledger.mark_completed(&order.id).await {
            Ok(TransitionOutcome::Applied(order)) => {
                self.grantor.grant_after_payment(&order).await;
                tracing::info!(order_id = %order.id, payme_id = %params.id, "Payme payment performed");
                Ok(performed_descriptor(&order))
            }
            Ok(TransitionOutcome::AlreadyApplied(order)) => Ok(performed_descriptor(&order)),
            Err(LedgerError::InvalidTransition { .. }) => Err(PaymeError::cannot_perform()),
            Err(LedgerError::NotFound(_)) => Err(PaymeError::transaction_not_found()),
            Err(e) => Err(system_error(e)),
        }
    }

    async fn cancel_transaction(
        &self,
        request: &PaymeRequest,
    ) -> Result<CancelTransactionResult, PaymeError> {
        let params: CancelTransactionParams = request.params()?;
        let order = self
            .find_by_transaction(&params.id)
            .await?
            .ok_or_else(PaymeError::transaction_not_found)?;

        if order.is_completed() {
            return Err(PaymeError::cannot_cancel_completed());
        }

        match self.ledger.mark_failed(&order.id).await {
            Ok(outcome) => {
                if outcome.was_applied() {
                    tracing::info!(order_id = %order.id, reason = ?params.reason, "Payme transaction cancelled");
                }
                Ok(cancelled_descriptor(outcome.order()))
            }
            Err(LedgerError::InvalidTransition { .. }) => {
                Err(PaymeError::cannot_cancel_completed())
            }
            Err(LedgerError::NotFound(_)) => Err(PaymeError::transaction_not_found()),
            Err(e) => Err(system_error(e)),
        }
    }

    async fn check_transaction(
        &self,
        request: &PaymeRequest,
    ) -> Result<CheckTransactionResult, PaymeError> {
        let params: TransactionRef = request.params()?;
        let order = self
            .find_by_transaction(&params.id)
            .await?
            .ok_or_else(PaymeError::transaction_not_found)?;

        Ok(CheckTransactionResult {
            create_time: order.created_at.as_unix_millis(),
            perform_time: millis_or_zero(order.completed_at),
            cancel_time: millis_or_zero(order.failed_at),
            transaction: order.id.to_string(),
            state: PaymeState::from(order.status),
            // Cancel reasons are not persisted.
            reason: None,
        })
    }

    async fn get_statement(
        &self,
        request: &PaymeRequest,
    ) -> Result<GetStatementResult, PaymeError> {
        let params: GetStatementParams = request.params()?;
        let from = Timestamp::from_unix_millis(params.from)
            .ok_or_else(|| PaymeError::invalid_request("from out of range"))?;
        let to = Timestamp::from_unix_millis(params.to)
            .ok_or_else(|| PaymeError::invalid_request("to out of range"))?;

        let orders = self
            .ledger
            .list_by_provider_between(PaymentProvider::Payme, from, to)
            .await
            .map_err(system_error)?;

        let transactions = orders
            .iter()
            .filter(|o| o.has_provider_reference())
            .map(|order| StatementEntry {
                id: order.transaction_id.clone(),
                time: order.created_at.as_unix_millis(),
                amount: order.amount * TIYIN_PER_UZS,
                account: PaymeAccount {
                    order_id: order.id.to_string(),
                },
                create_time: order.created_at.as_unix_millis(),
                perform_time: millis_or_zero(order.completed_at),
                cancel_time: millis_or_zero(order.failed_at),
                transaction: order.id.to_string(),
                state: PaymeState::from(order.status),
                reason: None,
            })
            .collect();

        Ok(GetStatementResult { transactions })
    }

    /// Resolves `account.order_id` to a Payme order.
    async fn order_for_account(&self, account: &PaymeAccount) -> Result<Order, PaymeError> {
        let order_id: OrderId = account
            .order_id
            .parse()
            .map_err(|_| PaymeError::order_not_found())?;

        let order = self
            .ledger
            .find_order(&order_id)
            .await
            .map_err(system_error)?
            .ok_or_else(|| {
                tracing::warn!(order_id = %order_id, "Payme call for unknown order");
                PaymeError::order_not_found()
            })?;

        if order.provider != PaymentProvider::Payme {
            tracing::warn!(order_id = %order_id, provider = %order.provider, "Payme call for another provider's order");
            return Err(PaymeError::order_not_found());
        }
        Ok(order)
    }

    async fn find_by_transaction(&self, payme_id: &str) -> Result<Option<Order>, PaymeError> {
        self.ledger
            .find_by_provider_transaction(PaymentProvider::Payme, payme_id)
            .await
            .map_err(system_error)
    }
}

/// Extracts the request id without requiring a valid envelope, so even a
/// parse failure can echo it.
fn request_id(body: &[u8]) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(Value::Null)
}

fn check_amount(order: &Order, amount_tiyin: i64) -> Result<(), PaymeError> {
    let expected = order.amount * TIYIN_PER_UZS;
    if expected != amount_tiyin {
        tracing::warn!(
            order_id = %order.id,
            expected,
            received = amount_tiyin,
            "Payme amount mismatch"
        );
        return Err(PaymeError::incorrect_amount());
    }
    Ok(())
}

fn millis_or_zero(at: Option<Timestamp>) -> i64 {
    at.map(|t| t.as_unix_millis()).unwrap_or(0)
}

/// `create_time` is the order's creation instant, not the moment the Payme id
/// was bound. It is immutable, so Create, Check and GetStatement all report
/// the same value for one transaction.
fn created_descriptor(order: &Order) -> CreateTransactionResult {
    CreateTransactionResult {
        create_time: order.created_at.as_unix_millis(),
        transaction: order.id.to_string(),
        state: PaymeState::from(order.status),
    }
}

fn performed_descriptor(order: &Order) -> PerformTransactionResult {
    PerformTransactionResult {
        transaction: order.id.to_string(),
        perform_time: millis_or_zero(order.completed_at),
        state: PaymeState::Performed,
    }
}

fn cancelled_descriptor(order: &Order) -> CancelTransactionResult {
    CancelTransactionResult {
        transaction: order.id.to_string(),
        cancel_time: millis_or_zero(order.failed_at),
        state: PaymeState::Cancelled,
    }
}

fn system_error(err: LedgerError) -> PaymeError {
    tracing::error!(error = %err, "Ledger failure while handling Payme call");
    PaymeError::system_error()
}
