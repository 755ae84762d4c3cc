//! Click SHOP API (prepare/complete callbacks).
//!
//! Click posts form-encoded callbacks and reads business errors from the
//! `error` field of a 200 response; nothing here is a transport error.

use md5::{Digest, Md5};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use url::Url;

use crate::domain::foundation::OrderId;

/// Callback phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    Prepare,
    Complete,
    Unknown(String),
}

impl ClickAction {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => ClickAction::Prepare,
            "1" => ClickAction::Complete,
            other => ClickAction::Unknown(other.to_string()),
        }
    }
}

/// Error codes Click understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickErrorCode {
    Success,
    SignFailed,
    IncorrectAmount,
    ActionNotFound,
    AlreadyPaid,
    OrderNotFound,
    TransactionNotFound,
    RequestError,
    TransactionCancelled,
}

impl ClickErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            ClickErrorCode::Success => 0,
            ClickErrorCode::SignFailed => -1,
            ClickErrorCode::IncorrectAmount => -2,
            ClickErrorCode::ActionNotFound => -3,
            ClickErrorCode::AlreadyPaid => -4,
            ClickErrorCode::OrderNotFound => -5,
            ClickErrorCode::TransactionNotFound => -6,
            ClickErrorCode::RequestError => -8,
            ClickErrorCode::TransactionCancelled => -9,
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            ClickErrorCode::Success => "Success",
            ClickErrorCode::SignFailed => "SIGN CHECK FAILED!",
            ClickErrorCode::IncorrectAmount => "Incorrect parameter amount",
            ClickErrorCode::ActionNotFound => "Action not found",
            ClickErrorCode::AlreadyPaid => "Already paid",
            ClickErrorCode::OrderNotFound => "User does not exist",
            ClickErrorCode::TransactionNotFound => "Transaction does not exist",
            ClickErrorCode::RequestError => "Error in request from click",
            ClickErrorCode::TransactionCancelled => "Transaction cancelled",
        }
    }
}

/// Form fields of a prepare or complete callback.
///
/// Values stay as the raw strings Click sent, because the signature is
/// computed over exactly those strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickRequest {
    pub click_trans_id: String,
    pub service_id: String,
    #[serde(default)]
    pub click_paydoc_id: Option<String>,
    pub merchant_trans_id: String,
    /// Complete only: the id returned from prepare.
    #[serde(default)]
    pub merchant_prepare_id: Option<String>,
    /// Decimal sum, e.g. `100000.00`.
    pub amount: String,
    pub action: String,
    /// Complete only: negative when Click aborted the payment.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_note: Option<String>,
    pub sign_time: String,
    pub sign_string: String,
}

impl ClickRequest {
    pub fn action(&self) -> ClickAction {
        ClickAction::from_code(&self.action)
    }

    /// Lowercase hex MD5 over the fixed field sequence.
    ///
    /// `merchant_prepare_id` takes part only in complete callbacks.
    pub fn expected_signature(&self, secret: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.click_trans_id.as_bytes());
        hasher.update(self.service_id.as_bytes());
        hasher.update(secret.as_bytes());
        hasher.update(self.merchant_trans_id.as_bytes());
        if self.action() == ClickAction::Complete {
            if let Some(prepare_id) = &self.merchant_prepare_id {
                hasher.update(prepare_id.as_bytes());
            }
        }
        hasher.update(self.amount.as_bytes());
        hasher.update(self.action.as_bytes());
        hasher.update(self.sign_time.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn signature_matches(&self, secret: &str) -> bool {
        let expected = self.expected_signature(secret);
        let provided = self.sign_string.trim().to_ascii_lowercase();
        expected.len() == provided.len()
            && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
    }

    /// Parsed amount in whole sum.
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::from_str(self.amount.trim()).ok()
    }

    /// True when Click reports the payment failed on its side.
    pub fn reports_failure(&self) -> bool {
        self.error
            .as_deref()
            .and_then(|e| e.trim().parse::<i32>().ok())
            .map(|code| code < 0)
            .unwrap_or(false)
    }
}

/// JSON reply to a callback.
///
/// Prepare replies carry `merchant_prepare_id`; complete replies carry
/// `merchant_confirm_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickResponse {
    pub click_trans_id: String,
    pub merchant_trans_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_prepare_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_confirm_id: Option<String>,
    pub error: i32,
    pub error_note: String,
}

impl ClickResponse {
    pub fn prepared(request: &ClickRequest, prepare_id: impl Into<String>) -> Self {
        Self {
            merchant_prepare_id: Some(prepare_id.into()),
            ..Self::error(request, ClickErrorCode::Success)
        }
    }

    pub fn confirmed(request: &ClickRequest, confirm_id: impl Into<String>) -> Self {
        Self {
            merchant_confirm_id: Some(confirm_id.into()),
            ..Self::error(request, ClickErrorCode::Success)
        }
    }

    pub fn error(request: &ClickRequest, code: ClickErrorCode) -> Self {
        Self {
            click_trans_id: request.click_trans_id.clone(),
            merchant_trans_id: request.merchant_trans_id.clone(),
            merchant_prepare_id: None,
            merchant_confirm_id: None,
            error: code.code(),
            error_note: code.note().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error == ClickErrorCode::Success.code()
    }
}

/// Builds the hosted payment page link with the order as `transaction_param`.
pub fn checkout_url(
    base: &str,
    service_id: &str,
    merchant_id: &str,
    amount: i64,
    order_id: &OrderId,
    return_url: Option<&str>,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("service_id", service_id)
            .append_pair("merchant_id", merchant_id)
            .append_pair("amount", &amount.to_string())
            .append_pair("transaction_param", &order_id.to_string());
        if let Some(return_url) = return_url.filter(|u| !u.is_empty()) {
            query.append_pair("return_url", return_url);
        }
    }
    Ok(url.into())
}
