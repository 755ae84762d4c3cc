//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! - `PostgresOrderLedger` - course and subscription orders
//! - `PostgresEntitlementStore` - enrollments, instructor plans and profiles
//! - `PostgresCatalog` - course prices and user roles

mod catalog;
mod entitlement_store;
mod order_ledger;

pub use catalog::PostgresCatalog;
pub use entitlement_store::PostgresEntitlementStore;
pub use order_ledger::PostgresOrderLedger;
