//! In-memory adapters.
//!
//! Deterministic stand-ins for the PostgreSQL and Stripe adapters, used by
//! unit tests, integration tests and local runs without a database.
//!
//! # Panics
//!
//! Methods panic if an internal lock is poisoned. These adapters are not
//! meant for production traffic.

mod catalog;
mod checkout_gateway;
mod entitlement_store;
mod order_ledger;

pub use catalog::InMemoryCatalog;
pub use checkout_gateway::StubCheckoutGateway;
pub use entitlement_store::InMemoryEntitlementStore;
pub use order_ledger::InMemoryOrderLedger;
