//! HTTP handlers for checkout and provider callback endpoints.
//!
//! These handlers connect Axum routes to the payment application handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use secrecy::SecretString;

use crate::application::handlers::payment::{
    CheckoutError, CheckoutSettings, ClickCallbackHandler, EntitlementGrantor,
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, ListOrdersHandler, ListOrdersQuery,
    PaymeRpcHandler, StartCheckoutHandler, StartCourseCheckoutCommand,
    StartSubscriptionCheckoutCommand,
};
use crate::domain::billing::{LedgerError, PaymentProvider};
use crate::domain::entitlement::InstructorPlan;
use crate::domain::foundation::{CourseId, UserId};
use crate::domain::gateway::click::{ClickErrorCode, ClickRequest, ClickResponse};
use crate::domain::gateway::payme::PaymeCredentials;
use crate::domain::gateway::stripe::{StripeWebhookVerifier, WebhookError};
use crate::ports::{
    CourseCatalog, CurrencyConverter, EntitlementStore, HostedCheckoutGateway, OrderLedger,
    UserDirectory,
};

use super::dto::{
    CheckoutResponse, CourseCheckoutRequest, ErrorResponse, HealthResponse, OrderListResponse,
    OrderView, SubscriptionCheckoutRequest, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Adapters the payment endpoints run against.
#[derive(Clone)]
pub struct PaymentPorts {
    pub order_ledger: Arc<dyn OrderLedger>,
    pub catalog: Arc<dyn CourseCatalog>,
    pub users: Arc<dyn UserDirectory>,
    pub entitlements: Arc<dyn EntitlementStore>,
    pub hosted_checkout: Arc<dyn HostedCheckoutGateway>,
    pub converter: Arc<dyn CurrencyConverter>,
}

/// Secrets used to authenticate inbound provider calls.
pub struct ProviderCredentials {
    pub stripe_webhook_secret: SecretString,
    pub payme: PaymeCredentials,
    pub click_secret: SecretString,
    pub click_service_id: String,
}

/// Shared application state.
///
/// Provider handlers hold credentials, so they are built once and shared;
/// cheap query handlers are created per request.
#[derive(Clone)]
pub struct PaymentAppState {
    pub order_ledger: Arc<dyn OrderLedger>,
    pub checkout: Arc<StartCheckoutHandler>,
    pub stripe_webhooks: Arc<HandleStripeWebhookHandler>,
    pub payme: Arc<PaymeRpcHandler>,
    pub click: Arc<ClickCallbackHandler>,
}

impl PaymentAppState {
    pub fn new(
        ports: PaymentPorts,
        credentials: ProviderCredentials,
        settings: CheckoutSettings,
    ) -> Self {
        let grantor = Arc::new(EntitlementGrantor::new(
            ports.entitlements.clone(),
            ports.users.clone(),
        ));

        let checkout = StartCheckoutHandler::new(
            ports.order_ledger.clone(),
            ports.catalog.clone(),
            ports.entitlements.clone(),
            ports.hosted_checkout.clone(),
            ports.converter.clone(),
            settings,
        );
        let stripe_webhooks = HandleStripeWebhookHandler::new(
            StripeWebhookVerifier::new(credentials.stripe_webhook_secret),
            ports.order_ledger.clone(),
            grantor.clone(),
        );
        let payme = PaymeRpcHandler::new(
            credentials.payme,
            ports.order_ledger.clone(),
            grantor.clone(),
        );
        let click = ClickCallbackHandler::new(
            credentials.click_secret,
            credentials.click_service_id,
            ports.order_ledger.clone(),
            grantor,
        );

        Self {
            order_ledger: ports.order_ledger,
            checkout: Arc::new(checkout),
            stripe_webhooks: Arc::new(stripe_webhooks),
            payme: Arc::new(payme),
            click: Arc::new(click),
        }
    }

    pub fn list_orders_handler(&self) -> ListOrdersHandler {
        ListOrdersHandler::new(self.order_ledger.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// Session verification lives in the auth service in front of this one;
/// it forwards the verified user as an `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout and Orders
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /api/checkout/course - Start a course purchase
pub async fn start_course_checkout(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    request: Result<Json<CourseCheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let Json(request) = request?;

    let course_id = required(request.course_id, "course_id")?;
    let course_id =
        CourseId::new(course_id).map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
    let provider = parse_provider(request.provider)?;

    let redirect = state
        .checkout
        .start_course_checkout(StartCourseCheckoutCommand {
            user_id: user.user_id,
            course_id,
            provider,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        url: redirect.url,
        order_id: redirect.order_id.to_string(),
    }))
}

/// POST /api/checkout/subscription - Start an instructor plan payment
pub async fn start_subscription_checkout(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
    request: Result<Json<SubscriptionCheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let Json(request) = request?;

    let plan = required(request.plan, "plan")?
        .parse::<InstructorPlan>()
        .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))?;
    let provider = parse_provider(request.provider)?;

    let redirect = state
        .checkout
        .start_subscription_checkout(StartSubscriptionCheckoutCommand {
            user_id: user.user_id,
            plan,
            provider,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        url: redirect.url,
        order_id: redirect.order_id.to_string(),
    }))
}

/// GET /api/orders - Current user's orders, newest first
pub async fn list_orders(
    State(state): State<PaymentAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let orders = state
        .list_orders_handler()
        .handle(ListOrdersQuery {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(OrderView::from).collect(),
    }))
}

fn required(value: Option<String>, field: &str) -> Result<String, CheckoutError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CheckoutError::InvalidRequest(format!("missing field '{}'", field)))
}

fn parse_provider(value: Option<String>) -> Result<PaymentProvider, CheckoutError> {
    required(value, "provider")?
        .parse::<PaymentProvider>()
        .map_err(|e| CheckoutError::InvalidRequest(e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider Callbacks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Stripe Checkout events
pub async fn handle_stripe_webhook(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .stripe_webhooks
        .handle(HandleStripeWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    tracing::debug!(?outcome, "Stripe webhook acknowledged");
    Ok(Json(WebhookAck { received: true }))
}

/// POST /api/payments/payme - Payme Merchant API
///
/// Always 200; failures travel inside the JSON-RPC envelope.
pub async fn handle_payme_rpc(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    Json(state.payme.handle(authorization, &body).await)
}

/// POST /api/payments/click - Click prepare/complete callback
///
/// Business failures are 200 with a negative `error`; only an
/// infrastructure failure is a 500, which makes Click retry.
pub async fn handle_click_callback(
    State(state): State<PaymentAppState>,
    body: Bytes,
) -> axum::response::Response {
    let request = match serde_urlencoded::from_bytes::<ClickRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed Click callback");
            let reply = ClickResponse::error(&ClickRequest::default(), ClickErrorCode::RequestError);
            return Json(reply).into_response();
        }
    };

    match state.click.handle(request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            let body = ErrorResponse::new("INTERNAL_ERROR", e.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts checkout errors to HTTP responses.
#[derive(Debug)]
pub struct CheckoutApiError(CheckoutError);

impl From<CheckoutError> for CheckoutApiError {
    fn from(err: CheckoutError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for CheckoutApiError {
    fn from(err: LedgerError) -> Self {
        Self(CheckoutError::from(err))
    }
}

impl From<JsonRejection> for CheckoutApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CheckoutError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for CheckoutApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            CheckoutError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            CheckoutError::CourseNotFound(_) => (StatusCode::NOT_FOUND, "COURSE_NOT_FOUND"),
            CheckoutError::NotPurchasable(_) => (StatusCode::PAYMENT_REQUIRED, "NOT_PURCHASABLE"),
            CheckoutError::AlreadyEnrolled(_) => {
                (StatusCode::PAYMENT_REQUIRED, "ALREADY_ENROLLED")
            }
            CheckoutError::Gateway(_) => (StatusCode::BAD_GATEWAY, "PAYMENT_PROVIDER_ERROR"),
            CheckoutError::Conversion(_) | CheckoutError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Checkout request failed");
        }

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// API error type for rejected Stripe deliveries.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let error_code = match &self.0 {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_TIMESTAMP"
            }
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::Infrastructure(_) => "INTERNAL_ERROR",
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (self.0.status_code(), Json(body)).into_response()
    }
}
