//! Stripe Checkout webhooks.

mod errors;
mod event;
mod signature;

pub use errors::WebhookError;
pub use event::{CheckoutSessionObject, StripeEvent, StripeEventData, StripeEventType};
pub use signature::{SignatureHeader, StripeWebhookVerifier};
