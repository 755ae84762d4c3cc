//! HTTP adapters - REST API implementations.

pub mod payment;

pub use payment::{payment_router, PaymentAppState, PaymentPorts, ProviderCredentials};
