//! Axum router configuration for payment endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    handle_click_callback, handle_payme_rpc, handle_stripe_webhook, health, list_orders,
    start_course_checkout, start_subscription_checkout, PaymentAppState,
};

/// Buyer-facing routes (require `X-User-Id`).
///
/// - `POST /checkout/course` - Start a course purchase
/// - `POST /checkout/subscription` - Start an instructor plan payment
/// - `GET /orders` - List the current user's orders
pub fn checkout_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/checkout/course", post(start_course_checkout))
        .route("/checkout/subscription", post(start_subscription_checkout))
        .route("/orders", get(list_orders))
}

/// Provider callback routes.
///
/// These authenticate the provider, not a user: Stripe by signature,
/// Payme by Basic auth, Click by MD5 sign string.
pub fn provider_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/webhooks/stripe", post(handle_stripe_webhook))
        .route("/payments/payme", post(handle_payme_rpc))
        .route("/payments/click", post(handle_click_callback))
}

/// Create the complete application router.
///
/// ```ignore
/// let app = payment_router(state, Duration::from_secs(30));
/// axum::serve(listener, app).await?;
/// ```
pub fn payment_router(state: PaymentAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new().merge(checkout_routes()).merge(provider_routes()),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
