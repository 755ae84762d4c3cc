//! Stripe Checkout client.
//!
//! Creates one-off `mode=payment` sessions priced inline, so no Stripe
//! product or price objects need to exist.
//!
//! # Retries
//!
//! Network failures and 5xx responses are retried up to `max_retries`
//! times with exponential backoff (250 ms, 500 ms, …). Every attempt sends
//! the order id as `Idempotency-Key`, so a retry after a lost response
//! returns the session Stripe already created.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    HostedCheckoutGateway, HostedCheckoutRequest, HostedCheckoutSession, PaymentError,
    PaymentErrorCode,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const BASE_BACKOFF_MS: u64 = 250;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeCheckoutConfig {
    /// Secret API key (`sk_live_…` or `sk_test_…`).
    api_key: SecretString,
    success_url: String,
    cancel_url: String,
    api_base_url: String,
    max_retries: u32,
    timeout: Duration,
}

impl StripeCheckoutConfig {
    pub fn new(
        api_key: SecretString,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_retries: 2,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct StripeCheckoutClient {
    config: StripeCheckoutConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeCheckoutClient {
    pub fn new(config: StripeCheckoutConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send_once(
        &self,
        request: &HostedCheckoutRequest,
        params: &[(String, String)],
    ) -> Result<HostedCheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", request.order_id.to_string())
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let session: SessionResponse = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse Stripe response: {}", e))
        })?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::invalid_response("Stripe session has no url"))?;

        Ok(HostedCheckoutSession {
            id: session.id,
            url,
        })
    }
}

/// Form fields for an inline-priced, single line item session.
fn session_params(
    config: &StripeCheckoutConfig,
    request: &HostedCheckoutRequest,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("client_reference_id".to_string(), request.order_id.to_string()),
        ("success_url".to_string(), config.success_url.clone()),
        ("cancel_url".to_string(), config.cancel_url.clone()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.code().to_ascii_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }
    params
}

fn classify_failure(status: StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());

    let code = match status.as_u16() {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        429 => PaymentErrorCode::RateLimited,
        400..=499 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let err = PaymentError::new(code, format!("Stripe API error {}: {}", status, message));
    match parsed.and_then(|e| e.error.code) {
        Some(provider_code) => err.with_provider_code(provider_code),
        None => err,
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.min(6))
}

#[async_trait]
impl HostedCheckoutGateway for StripeCheckoutClient {
    async fn create_session(
        &self,
        request: HostedCheckoutRequest,
    ) -> Result<HostedCheckoutSession, PaymentError> {
        let params = session_params(&self.config, &request);
        let mut attempt = 0;

        loop {
            match self.send_once(&request, &params).await {
                Ok(session) => return Ok(session),
                Err(err) if err.retryable && attempt < self.config.max_retries => {
                    let delay = backoff(attempt);
                    tracing::warn!(
                        order_id = %request.order_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Stripe session creation failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(order_id = %request.order_id, error = %err, "Stripe session creation failed");
                    return Err(err);
                }
            }
        }
    }
}
