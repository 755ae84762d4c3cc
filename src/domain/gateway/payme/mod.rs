//! Payme Merchant API (JSON-RPC 2.0).
//!
//! Payme drives the order through RPC calls: check, create, perform,
//! cancel and check-transaction. Every response is HTTP 200 carrying either
//! `result` or a numeric `error`.

mod auth;
mod checkout;
mod error;
mod request;
mod response;

pub use auth::PaymeCredentials;
pub use checkout::checkout_url;
pub use error::{LocalizedMessage, PaymeError};
pub use request::{
    CancelTransactionParams, CheckPerformParams, CreateTransactionParams, GetStatementParams,
    PaymeAccount, PaymeMethod, PaymeRequest, TransactionRef,
};
pub use response::{
    CancelTransactionResult, CheckPerformResult, CheckTransactionResult, CreateTransactionResult,
    GetStatementResult, PaymeResponse, PaymeState, PerformTransactionResult, StatementEntry,
};

/// Tiyin per sum.
pub const TIYIN_PER_UZS: i64 = 100;
