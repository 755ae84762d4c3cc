//! Outbound JSON-RPC responses.

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{PaymeAccount, PaymeError};
use crate::domain::billing::OrderStatus;

/// Payme's numeric transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymeState {
    Created,
    Performed,
    Cancelled,
}

impl PaymeState {
    pub fn code(&self) -> i32 {
        match self {
            PaymeState::Created => 1,
            PaymeState::Performed => 2,
            PaymeState::Cancelled => -1,
        }
    }
}

impl From<OrderStatus> for PaymeState {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => PaymeState::Created,
            OrderStatus::Completed => PaymeState::Performed,
            OrderStatus::Failed => PaymeState::Cancelled,
        }
    }
}

impl Serialize for PaymeState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckPerformResult {
    pub allow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTransactionResult {
    pub create_time: i64,
    /// Merchant-side transaction id (the order id).
    pub transaction: String,
    pub state: PaymeState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformTransactionResult {
    pub transaction: String,
    pub perform_time: i64,
    pub state: PaymeState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelTransactionResult {
    pub transaction: String,
    pub cancel_time: i64,
    pub state: PaymeState,
}

/// Times are 0 when the corresponding event has not happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckTransactionResult {
    pub create_time: i64,
    pub perform_time: i64,
    pub cancel_time: i64,
    pub transaction: String,
    pub state: PaymeState,
    pub reason: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementEntry {
    /// Payme transaction id.
    pub id: String,
    pub time: i64,
    /// Tiyin.
    pub amount: i64,
    pub account: PaymeAccount,
    pub create_time: i64,
    pub perform_time: i64,
    pub cancel_time: i64,
    pub transaction: String,
    pub state: PaymeState,
    pub reason: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetStatementResult {
    pub transactions: Vec<StatementEntry>,
}

/// `{ "jsonrpc": "2.0", "id": …, "result" | "error": … }`
#[derive(Debug, Clone, Serialize)]
pub struct PaymeResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PaymeError>,
}

impl PaymeResponse {
    pub fn success(id: Value, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize Payme result");
                Self::failure(id, PaymeError::system_error())
            }
        }
    }

    pub fn failure(id: Value, error: PaymeError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}
