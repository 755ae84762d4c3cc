//! Billing domain - orders and their payment lifecycle.
//!
//! An [`Order`] records one checkout attempt. Its [`OrderStatus`] only ever
//! moves `pending → completed` or `pending → failed`; provider adapters rely
//! on that to grant entitlements exactly once.

mod currency;
mod errors;
mod order;
mod provider;
mod status;

pub use currency::Currency;
pub use errors::LedgerError;
pub use order::{placeholder_transaction_id, Order, OrderKind, OrderSubject, TransitionOutcome};
pub use provider::PaymentProvider;
pub use status::OrderStatus;
