//! Stripe Checkout adapter.
//!
//! Implements the `HostedCheckoutGateway` port against the Stripe REST API.
//! Inbound webhooks are verified in `domain::gateway::stripe`; this module
//! only talks outbound.
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and only exposed when
//!   building the request
//! - Session creation sends the order id as `Idempotency-Key`, so a retried
//!   call never opens a second session

mod checkout_client;

pub use checkout_client::{StripeCheckoutClient, StripeCheckoutConfig};
