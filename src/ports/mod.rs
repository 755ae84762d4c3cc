//! Ports - interfaces between the application core and the outside world.
//!
//! Adapters implement these traits; handlers receive them as `Arc<dyn …>`.

mod catalog;
mod checkout_gateway;
mod currency_converter;
mod entitlement_store;
mod order_ledger;

pub use catalog::{CourseCatalog, CourseListing, UserAccount, UserDirectory};
pub use checkout_gateway::{
    HostedCheckoutGateway, HostedCheckoutRequest, HostedCheckoutSession, PaymentError,
    PaymentErrorCode,
};
pub use currency_converter::{ConversionError, CurrencyConverter};
pub use entitlement_store::EntitlementStore;
pub use order_ledger::OrderLedger;
