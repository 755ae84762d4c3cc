//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Order ledger, entitlements and catalog on PostgreSQL (sqlx)
//! - `memory` - In-memory fakes for tests and database-less runs
//! - `stripe` - Stripe Checkout sessions over HTTPS (reqwest)
//! - `currency` - Currency conversion strategies
//! - `http` - Axum REST surface

pub mod currency;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use currency::FixedRateConverter;
pub use memory::{InMemoryCatalog, InMemoryEntitlementStore, InMemoryOrderLedger, StubCheckoutGateway};
pub use postgres::{PostgresCatalog, PostgresEntitlementStore, PostgresOrderLedger};
pub use stripe::{StripeCheckoutClient, StripeCheckoutConfig};
