//! StartCheckoutHandler - creates a pending order and the provider redirect.
//!
//! Stripe needs an outbound session; Payme and Click redirects are pure
//! URL construction.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::billing::{Currency, LedgerError, Order, OrderSubject, PaymentProvider};
use crate::domain::entitlement::InstructorPlan;
use crate::domain::foundation::{CourseId, DomainError, OrderId, UserId};
use crate::domain::gateway::{click, payme};
use crate::ports::{
    ConversionError, CourseCatalog, CurrencyConverter, EntitlementStore, HostedCheckoutGateway,
    HostedCheckoutRequest, OrderLedger, PaymentError,
};

/// Command to buy a single course.
#[derive(Debug, Clone)]
pub struct StartCourseCheckoutCommand {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub provider: PaymentProvider,
}

/// Command to pay for one period of an instructor plan.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCheckoutCommand {
    pub user_id: UserId,
    pub plan: InstructorPlan,
    pub provider: PaymentProvider,
}

/// Where to send the buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    pub url: String,
    pub order_id: OrderId,
}

/// Merchant settings for the URL-encoded providers.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub payme_checkout_url: String,
    pub payme_merchant_id: String,
    pub payme_return_url: Option<String>,
    pub click_checkout_url: String,
    pub click_service_id: String,
    pub click_merchant_id: String,
    pub click_return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Course {0} is free and cannot be purchased")]
    NotPurchasable(CourseId),

    #[error("Already enrolled in course {0}")]
    AlreadyEnrolled(CourseId),

    #[error("Payment provider error: {0}")]
    Gateway(String),

    #[error("Currency conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        CheckoutError::Infrastructure(err.to_string())
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        CheckoutError::Infrastructure(err.to_string())
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        CheckoutError::Gateway(err.to_string())
    }
}

/// What is being sold, priced in whole units.
struct Priced {
    subject: OrderSubject,
    product_name: String,
    amount: i64,
    currency: Currency,
}

pub struct StartCheckoutHandler {
    ledger: Arc<dyn OrderLedger>,
    catalog: Arc<dyn CourseCatalog>,
    entitlements: Arc<dyn EntitlementStore>,
    hosted_checkout: Arc<dyn HostedCheckoutGateway>,
    converter: Arc<dyn CurrencyConverter>,
    settings: CheckoutSettings,
}

impl StartCheckoutHandler {
    pub fn new(
        ledger: Arc<dyn OrderLedger>,
        catalog: Arc<dyn CourseCatalog>,
        entitlements: Arc<dyn EntitlementStore>,
        hosted_checkout: Arc<dyn HostedCheckoutGateway>,
        converter: Arc<dyn CurrencyConverter>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            ledger,
            catalog,
            entitlements,
            hosted_checkout,
            converter,
            settings,
        }
    }

    pub async fn start_course_checkout(
        &self,
        cmd: StartCourseCheckoutCommand,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        // 1. The course must exist and cost something
        let course = self
            .catalog
            .find_course(&cmd.course_id)
            .await?
            .ok_or_else(|| CheckoutError::CourseNotFound(cmd.course_id.clone()))?;

        if !course.is_purchasable() {
            return Err(CheckoutError::NotPurchasable(cmd.course_id));
        }

        // 2. No paying twice for the same course
        if self
            .entitlements
            .is_enrolled(&cmd.user_id, &cmd.course_id)
            .await?
        {
            return Err(CheckoutError::AlreadyEnrolled(cmd.course_id));
        }

        let priced = Priced {
            subject: OrderSubject::Course {
                user_id: cmd.user_id,
                course_id: course.id,
            },
            product_name: course.title,
            amount: course.price,
            currency: course.currency,
        };
        self.start(priced, cmd.provider).await
    }

    pub async fn start_subscription_checkout(
        &self,
        cmd: StartSubscriptionCheckoutCommand,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        let terms = cmd.plan.terms();
        let priced = Priced {
            subject: OrderSubject::Subscription {
                user_id: cmd.user_id,
                plan: cmd.plan,
            },
            product_name: format!("{} instructor plan", cmd.plan.display_name()),
            amount: terms.price_uzs,
            currency: Currency::Uzs,
        };
        self.start(priced, cmd.provider).await
    }

    async fn start(
        &self,
        priced: Priced,
        provider: PaymentProvider,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        let Priced {
            subject,
            product_name,
            mut amount,
            mut currency,
        } = priced;

        // Payme and Click only settle in sum, so the order is recorded in
        // the currency the callback will report.
        if provider != PaymentProvider::Stripe && currency != Currency::Uzs {
            let tiyin = self
                .converter
                .to_minor_units(amount, currency, Currency::Uzs)
                .await?;
            amount = tiyin / payme::TIYIN_PER_UZS;
            currency = Currency::Uzs;
        }

        let order = self
            .ledger
            .create_order(subject, provider, amount, currency)
            .await?;

        let redirect = match provider {
            PaymentProvider::Stripe => self.stripe_redirect(&order, product_name).await,
            PaymentProvider::Payme => Ok(self.payme_redirect(&order)),
            PaymentProvider::Click => self.click_redirect(&order),
        };

        match redirect {
            Ok(url) => {
                tracing::info!(
                    order_id = %order.id,
                    provider = %provider,
                    kind = order.kind().as_str(),
                    amount = order.amount,
                    currency = %order.currency,
                    "Checkout started"
                );
                Ok(CheckoutRedirect {
                    url,
                    order_id: order.id,
                })
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, provider = %provider, error = %e, "Checkout redirect failed");
                // Best effort: a dangling pending order is harmless, but
                // failing it keeps the ledger honest.
                if let Err(mark_err) = self.ledger.mark_failed(&order.id).await {
                    tracing::warn!(order_id = %order.id, error = %mark_err, "Could not fail abandoned order");
                }
                Err(e)
            }
        }
    }

    async fn stripe_redirect(
        &self,
        order: &Order,
        product_name: String,
    ) -> Result<String, CheckoutError> {
        let amount_minor = self
            .converter
            .to_minor_units(order.amount, order.currency, Currency::Usd)
            .await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order.id.to_string());
        metadata.insert("user_id".to_string(), order.user_id().to_string());
        metadata.insert("order_kind".to_string(), order.kind().as_str().to_string());
        match &order.subject {
            OrderSubject::Course { course_id, .. } => {
                metadata.insert("course_id".to_string(), course_id.to_string());
            }
            OrderSubject::Subscription { plan, .. } => {
                metadata.insert("plan".to_string(), plan.as_str().to_string());
            }
        }

        let session = self
            .hosted_checkout
            .create_session(HostedCheckoutRequest {
                order_id: order.id,
                product_name,
                amount_minor,
                currency: Currency::Usd,
                metadata,
            })
            .await?;

        tracing::debug!(order_id = %order.id, session_id = %session.id, "Stripe session created");
        Ok(session.url)
    }

    fn payme_redirect(&self, order: &Order) -> String {
        payme::checkout_url(
            &self.settings.payme_checkout_url,
            &self.settings.payme_merchant_id,
            &order.id,
            order.amount * payme::TIYIN_PER_UZS,
            self.settings.payme_return_url.as_deref(),
        )
    }

    fn click_redirect(&self, order: &Order) -> Result<String, CheckoutError> {
        click::checkout_url(
            &self.settings.click_checkout_url,
            &self.settings.click_service_id,
            &self.settings.click_merchant_id,
            order.amount,
            &order.id,
            self.settings.click_return_url.as_deref(),
        )
        .map_err(|e| CheckoutError::InvalidRequest(format!("click checkout url: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::currency::FixedRateConverter;
    use crate::adapters::memory::{
        InMemoryCatalog, InMemoryEntitlementStore, InMemoryOrderLedger, StubCheckoutGateway,
    };
    use crate::domain::billing::OrderStatus;
    use crate::domain::entitlement::Enrollment;
    use crate::domain::foundation::Timestamp;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    struct Fixture {
        ledger: Arc<InMemoryOrderLedger>,
        catalog: Arc<InMemoryCatalog>,
        entitlements: Arc<InMemoryEntitlementStore>,
        gateway: Arc<StubCheckoutGateway>,
        handler: StartCheckoutHandler,
    }

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            payme_checkout_url: "https://checkout.paycom.uz".to_string(),
            payme_merchant_id: "merchant-1".to_string(),
            payme_return_url: None,
            click_checkout_url: "https://my.click.uz/services/pay".to_string(),
            click_service_id: "svc-1".to_string(),
            click_merchant_id: "m-1".to_string(),
            click_return_url: Some("https://school.uz/done".to_string()),
        }
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let entitlements = Arc::new(InMemoryEntitlementStore::new());
        let gateway = Arc::new(StubCheckoutGateway::new());
        let handler = StartCheckoutHandler::new(
            ledger.clone(),
            catalog.clone(),
            entitlements.clone(),
            gateway.clone(),
            Arc::new(FixedRateConverter::new(12_500)),
            settings(),
        );
        Fixture {
            ledger,
            catalog,
            entitlements,
            gateway,
            handler,
        }
    }

    fn course_cmd(course: &str, provider: PaymentProvider) -> StartCourseCheckoutCommand {
        StartCourseCheckoutCommand {
            user_id: UserId::new("student-1").unwrap(),
            course_id: CourseId::new(course).unwrap(),
            provider,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let f = fixture();
        let err = f
            .handler
            .start_course_checkout(course_cmd("nope", PaymentProvider::Payme))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn free_course_is_not_purchasable() {
        let f = fixture();
        f.catalog.add_free_course("intro", "Intro");
        let err = f
            .handler
            .start_course_checkout(course_cmd("intro", PaymentProvider::Click))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotPurchasable(_)));
    }

    #[tokio::test]
    async fn enrolled_user_cannot_buy_again() {
        let f = fixture();
        let course = f.catalog.add_course("rust-101", "Rust", 100_000);
        let user = UserId::new("student-1").unwrap();
        f.entitlements
            .upsert_enrollment(&Enrollment::new(user, course, Timestamp::now()))
            .await
            .unwrap();

        let err = f
            .handler
            .start_course_checkout(course_cmd("rust-101", PaymentProvider::Payme))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadyEnrolled(_)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Provider redirects
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payme_redirect_encodes_amount_in_tiyin() {
        let f = fixture();
        f.catalog.add_course("rust-101", "Rust", 100_000);

        let redirect = f
            .handler
            .start_course_checkout(course_cmd("rust-101", PaymentProvider::Payme))
            .await
            .unwrap();

        let encoded = redirect
            .url
            .strip_prefix("https://checkout.paycom.uz/")
            .unwrap();
        let decoded = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
        assert_eq!(
            decoded,
            format!("m=merchant-1;ac.order_id={};a=10000000", redirect.order_id)
        );

        let order = f.ledger.get(&redirect.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount, 100_000);
        assert_eq!(order.provider, PaymentProvider::Payme);
    }

    #[tokio::test]
    async fn click_redirect_carries_order_reference() {
        let f = fixture();
        f.catalog.add_course("rust-101", "Rust", 100_000);

        let redirect = f
            .handler
            .start_course_checkout(course_cmd("rust-101", PaymentProvider::Click))
            .await
            .unwrap();

        assert!(redirect
            .url
            .starts_with("https://my.click.uz/services/pay?service_id=svc-1&merchant_id=m-1"));
        assert!(redirect.url.contains("amount=100000"));
        assert!(redirect
            .url
            .contains(&format!("transaction_param={}", redirect.order_id)));
        assert!(redirect.url.contains("return_url=https%3A%2F%2Fschool.uz%2Fdone"));
    }

    #[tokio::test]
    async fn stripe_session_is_priced_in_usd_cents_with_metadata() {
        let f = fixture();
        f.catalog.add_course("rust-101", "Rust", 125_000);

        let redirect = f
            .handler
            .start_course_checkout(course_cmd("rust-101", PaymentProvider::Stripe))
            .await
            .unwrap();

        let requests = f.gateway.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.amount_minor, 1_000);
        assert_eq!(request.currency, Currency::Usd);
        assert_eq!(request.metadata["order_id"], redirect.order_id.to_string());
        assert_eq!(request.metadata["course_id"], "rust-101");
        assert_eq!(request.metadata["order_kind"], "course_purchase");
        assert!(redirect.url.contains("cs_test_"));
    }

    #[tokio::test]
    async fn subscription_checkout_uses_plan_price() {
        let f = fixture();

        let redirect = f
            .handler
            .start_subscription_checkout(StartSubscriptionCheckoutCommand {
                user_id: UserId::new("inst-1").unwrap(),
                plan: InstructorPlan::Pro,
                provider: PaymentProvider::Click,
            })
            .await
            .unwrap();

        let order = f.ledger.get(&redirect.order_id).unwrap();
        assert_eq!(order.amount, 249_000);
        assert_eq!(order.currency, Currency::Uzs);
        assert!(matches!(
            order.subject,
            OrderSubject::Subscription {
                plan: InstructorPlan::Pro,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn usd_course_paid_with_payme_is_recorded_in_sum() {
        let f = fixture();
        f.catalog
            .add_listing("go-201", "Go", 20, Currency::Usd, false);

        let redirect = f
            .handler
            .start_course_checkout(course_cmd("go-201", PaymentProvider::Payme))
            .await
            .unwrap();

        let order = f.ledger.get(&redirect.order_id).unwrap();
        assert_eq!(order.currency, Currency::Uzs);
        assert_eq!(order.amount, 250_000);
    }

    #[tokio::test]
    async fn gateway_failure_fails_the_order() {
        let f = fixture();
        f.catalog.add_course("rust-101", "Rust", 125_000);
        f.gateway.set_failing(true);

        let err = f
            .handler
            .start_course_checkout(course_cmd("rust-101", PaymentProvider::Stripe))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Gateway(_)));
        let user = UserId::new("student-1").unwrap();
        let orders = f.ledger.list_for_user(&user).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Failed);
    }
}
