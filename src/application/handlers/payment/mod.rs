//! Payment command handlers.
//!
//! Each provider adapter verifies its callback, drives the order ledger and
//! grants entitlements only when the ledger reports that this call applied
//! the transition.

mod grant_entitlement;
mod handle_click_callback;
mod handle_payme_rpc;
mod handle_stripe_webhook;
mod list_orders;
mod start_checkout;

pub use grant_entitlement::{EntitlementGrantor, GrantError};
pub use handle_click_callback::{ClickCallbackError, ClickCallbackHandler};
pub use handle_payme_rpc::PaymeRpcHandler;
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, StripeWebhookOutcome,
};
pub use list_orders::{ListOrdersHandler, ListOrdersQuery};
pub use start_checkout::{
    CheckoutError, CheckoutRedirect, CheckoutSettings, StartCheckoutHandler,
    StartCourseCheckoutCommand, StartSubscriptionCheckoutCommand,
};
