//! HTTP adapter for payment endpoints.
//!
//! - `GET /health` - Liveness probe
//! - `POST /api/checkout/course` - Start a course purchase
//! - `POST /api/checkout/subscription` - Start an instructor plan payment
//! - `GET /api/orders` - Current user's orders
//! - `POST /api/webhooks/stripe` - Stripe Checkout webhooks
//! - `POST /api/payments/payme` - Payme Merchant API (JSON-RPC)
//! - `POST /api/payments/click` - Click prepare/complete callbacks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{
    AuthenticatedUser, CheckoutApiError, PaymentAppState, PaymentPorts, ProviderCredentials,
    WebhookApiError,
};
pub use routes::{checkout_routes, payment_router, provider_routes};
