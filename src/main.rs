use std::sync::Arc;

use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use course_payments::adapters::http::{
    payment_router, PaymentAppState, PaymentPorts, ProviderCredentials,
};
use course_payments::adapters::{
    FixedRateConverter, PostgresCatalog, PostgresEntitlementStore, PostgresOrderLedger,
    StripeCheckoutClient, StripeCheckoutConfig,
};
use course_payments::application::handlers::payment::CheckoutSettings;
use course_payments::config::{AppConfig, PaymentConfig};
use course_payments::domain::gateway::payme::PaymeCredentials;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    if config.payment.stripe.is_test_mode() {
        tracing::info!("Stripe is in test mode");
    }

    // Database
    tracing::info!(url = %config.database.redacted_url(), "Connecting to PostgreSQL");
    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Adapters
    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
    let stripe = &config.payment.stripe;
    let stripe_client = StripeCheckoutClient::new(
        StripeCheckoutConfig::new(
            SecretString::new(stripe.api_key.clone()),
            stripe.success_url_or(&config.server.public_base_url),
            stripe.cancel_url_or(&config.server.public_base_url),
        )
        .with_base_url(stripe.api_base_url.clone())
        .with_max_retries(stripe.max_retries),
    )?;

    let ports = PaymentPorts {
        order_ledger: Arc::new(PostgresOrderLedger::new(pool.clone())),
        catalog: catalog.clone(),
        users: catalog,
        entitlements: Arc::new(PostgresEntitlementStore::new(pool)),
        hosted_checkout: Arc::new(stripe_client),
        converter: Arc::new(FixedRateConverter::new(config.payment.currency.uzs_per_usd)),
    };
    let state = PaymentAppState::new(
        ports,
        provider_credentials(&config.payment),
        checkout_settings(&config.payment),
    );

    let app = payment_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = %config.server.environment, "Course payments listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON logs outside development, human-readable locally.
///
/// `RUST_LOG` wins over `server.log_level` when set.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.server.environment.wants_json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn provider_credentials(payment: &PaymentConfig) -> ProviderCredentials {
    ProviderCredentials {
        stripe_webhook_secret: SecretString::new(payment.stripe.webhook_secret.clone()),
        payme: PaymeCredentials::new(
            payment.payme.login.clone(),
            SecretString::new(payment.payme.secret_key.clone()),
        ),
        click_secret: SecretString::new(payment.click.secret_key.clone()),
        click_service_id: payment.click.service_id.clone(),
    }
}

fn checkout_settings(payment: &PaymentConfig) -> CheckoutSettings {
    CheckoutSettings {
        payme_checkout_url: payment.payme.checkout_url.clone(),
        payme_merchant_id: payment.payme.merchant_id.clone(),
        payme_return_url: payment.payme.return_url.clone(),
        click_checkout_url: payment.click.checkout_url.clone(),
        click_service_id: payment.click.service_id.clone(),
        click_merchant_id: payment.click.merchant_id.clone(),
        click_return_url: payment.click.return_url.clone(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
