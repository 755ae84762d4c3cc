//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    // Checkout
    CheckoutError, CheckoutRedirect, CheckoutSettings, StartCheckoutHandler,
    StartCourseCheckoutCommand, StartSubscriptionCheckoutCommand,
    // Provider callbacks
    ClickCallbackError, ClickCallbackHandler, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, PaymeRpcHandler, StripeWebhookOutcome,
    // Entitlements
    EntitlementGrantor, GrantError,
    // Queries
    ListOrdersHandler, ListOrdersQuery,
};
