//! Inbound JSON-RPC requests.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PaymeError;

/// JSON-RPC envelope as sent by Payme.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymeRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    /// Echoed verbatim in the response.
    #[serde(default)]
    pub id: Value,
}

impl PaymeRequest {
    /// Decodes `params` into the shape a method expects.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, PaymeError> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| PaymeError::invalid_request(e.to_string()))
    }
}

/// Merchant API methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymeMethod {
    CheckPerformTransaction,
    CreateTransaction,
    PerformTransaction,
    CancelTransaction,
    CheckTransaction,
    GetStatement,
    Unknown(String),
}

impl PaymeMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "CheckPerformTransaction" => Self::CheckPerformTransaction,
            "CreateTransaction" => Self::CreateTransaction,
            "PerformTransaction" => Self::PerformTransaction,
            "CancelTransaction" => Self::CancelTransaction,
            "CheckTransaction" => Self::CheckTransaction,
            "GetStatement" => Self::GetStatement,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckPerformTransaction => "CheckPerformTransaction",
            Self::CreateTransaction => "CreateTransaction",
            Self::PerformTransaction => "PerformTransaction",
            Self::CancelTransaction => "CancelTransaction",
            Self::CheckTransaction => "CheckTransaction",
            Self::GetStatement => "GetStatement",
            Self::Unknown(name) => name,
        }
    }
}

/// Merchant-side account fields configured in the Payme cabinet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymeAccount {
    #[serde(deserialize_with = "string_or_number")]
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckPerformParams {
    /// Tiyin.
    pub amount: i64,
    pub account: PaymeAccount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionParams {
    /// Payme transaction id.
    pub id: String,
    /// Payme-side creation time, ms.
    pub time: i64,
    /// Tiyin.
    pub amount: i64,
    pub account: PaymeAccount,
}

/// Params of Perform/CheckTransaction: just the Payme transaction id.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelTransactionParams {
    pub id: String,
    #[serde(default)]
    pub reason: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetStatementParams {
    /// ms, inclusive.
    pub from: i64,
    /// ms, inclusive.
    pub to: i64,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_keeps_raw_id() {
        let req: PaymeRequest = serde_json::from_value(json!({
            "method": "CheckTransaction",
            "params": {"id": "5e730e8e0b852a417aa49ceb"},
            "id": 2032
        }))
        .unwrap();

        assert_eq!(req.id, json!(2032));
        let params: TransactionRef = req.params().unwrap();
        assert_eq!(params.id, "5e730e8e0b852a417aa49ceb");
    }

    #[test]
    fn account_order_id_accepts_numbers() {
        let params: CheckPerformParams = serde_json::from_value(json!({
            "amount": 500000,
            "account": {"order_id": 42}
        }))
        .unwrap();
        assert_eq!(params.account.order_id, "42");
    }

    #[test]
    fn missing_params_are_invalid_request() {
        let req: PaymeRequest =
            serde_json::from_value(json!({"method": "CreateTransaction", "id": 1})).unwrap();
        let err = req.params::<CreateTransactionParams>().unwrap_err();
        assert_eq!(err.code, PaymeError::INVALID_REQUEST);
    }

    #[test]
    fn method_names_round_trip() {
        assert_eq!(
            PaymeMethod::from_name("PerformTransaction"),
            PaymeMethod::PerformTransaction
        );
        assert_eq!(
            PaymeMethod::from_name("ChangePassword"),
            PaymeMethod::Unknown("ChangePassword".to_string())
        );
        assert_eq!(PaymeMethod::GetStatement.as_str(), "GetStatement");
    }
}
