//! Payment provider configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ValidationError;

/// Settings for all three providers plus currency conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub stripe: StripeSettings,
    pub payme: PaymeSettings,
    pub click: ClickSettings,
    #[serde(default)]
    pub currency: CurrencySettings,
}

/// Stripe Checkout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSettings {
    /// Secret API key (`sk_test_…` / `sk_live_…`)
    pub api_key: String,

    /// Webhook endpoint signing secret (`whsec_…`)
    pub webhook_secret: String,

    /// Where Stripe sends the buyer after paying. Defaults under `server.public_base_url`.
    pub success_url: Option<String>,

    /// Where Stripe sends the buyer after abandoning. Defaults under `server.public_base_url`.
    pub cancel_url: Option<String>,

    /// Extra attempts for session creation after a retryable failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_stripe_api_base_url")]
    pub api_base_url: String,
}

/// Payme Merchant API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymeSettings {
    pub merchant_id: String,

    /// Key Payme presents in `Authorization: Basic`
    pub secret_key: String,

    #[serde(default = "default_payme_login")]
    pub login: String,

    #[serde(default = "default_payme_checkout_url")]
    pub checkout_url: String,

    pub return_url: Option<String>,
}

/// Click SHOP API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClickSettings {
    pub service_id: String,

    pub merchant_id: String,

    /// Secret mixed into callback sign strings
    pub secret_key: String,

    #[serde(default = "default_click_checkout_url")]
    pub checkout_url: String,

    pub return_url: Option<String>,
}

/// Exchange rate used when a provider charges in a different currency.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencySettings {
    #[serde(default = "default_uzs_per_usd")]
    pub uzs_per_usd: Decimal,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            uzs_per_usd: default_uzs_per_usd(),
        }
    }
}

impl StripeSettings {
    pub fn is_test_mode(&self) -> bool {
        self.api_key.starts_with("sk_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.api_key.starts_with("sk_live_")
    }

    /// Success URL, falling back to `<public_base_url>/payments/success`.
    pub fn success_url_or(&self, public_base_url: &str) -> String {
        self.success_url
            .clone()
            .unwrap_or_else(|| join_url(public_base_url, "payments/success"))
    }

    /// Cancel URL, falling back to `<public_base_url>/payments/cancelled`.
    pub fn cancel_url_or(&self, public_base_url: &str) -> String {
        self.cancel_url
            .clone()
            .unwrap_or_else(|| join_url(public_base_url, "payments/cancelled"))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe.api_key"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "payment.stripe.webhook_secret",
            ));
        }
        if !self.api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.max_retries > 5 {
            return Err(ValidationError::TooManyRetries);
        }
        check_url(&self.api_base_url, "payment.stripe.api_base_url")?;
        check_optional_url(self.success_url.as_deref(), "payment.stripe.success_url")?;
        check_optional_url(self.cancel_url.as_deref(), "payment.stripe.cancel_url")?;
        Ok(())
    }
}

impl PaymeSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("payment.payme.merchant_id"));
        }
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.payme.secret_key"));
        }
        check_url(&self.checkout_url, "payment.payme.checkout_url")?;
        check_optional_url(self.return_url.as_deref(), "payment.payme.return_url")
    }
}

impl ClickSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_id.is_empty() {
            return Err(ValidationError::MissingRequired("payment.click.service_id"));
        }
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("payment.click.merchant_id"));
        }
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.click.secret_key"));
        }
        check_url(&self.checkout_url, "payment.click.checkout_url")?;
        check_optional_url(self.return_url.as_deref(), "payment.click.return_url")
    }
}

impl CurrencySettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uzs_per_usd <= Decimal::ZERO {
            return Err(ValidationError::InvalidExchangeRate);
        }
        Ok(())
    }
}

impl PaymentConfig {
    /// Validate every provider section
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.stripe.validate()?;
        self.payme.validate()?;
        self.click.validate()?;
        self.currency.validate()
    }

    /// Production redirects and provider endpoints must be HTTPS.
    pub fn validate_for_production(&self) -> Result<(), ValidationError> {
        let urls = [
            (Some(self.stripe.api_base_url.as_str()), "payment.stripe.api_base_url"),
            (self.stripe.success_url.as_deref(), "payment.stripe.success_url"),
            (self.stripe.cancel_url.as_deref(), "payment.stripe.cancel_url"),
            (Some(self.payme.checkout_url.as_str()), "payment.payme.checkout_url"),
            (Some(self.click.checkout_url.as_str()), "payment.click.checkout_url"),
        ];
        for (url, key) in urls {
            if let Some(url) = url {
                if !url.starts_with("https://") {
                    return Err(ValidationError::UrlMustBeHttps(key));
                }
            }
        }
        Ok(())
    }
}

fn check_url(value: &str, key: &'static str) -> Result<(), ValidationError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidUrl(key))
}

fn check_optional_url(value: Option<&str>, key: &'static str) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |v| check_url(v, key))
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

fn default_max_retries() -> u32 {
    2
}

fn default_stripe_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_payme_login() -> String {
    "Paycom".to_string()
}

fn default_payme_checkout_url() -> String {
    "https://checkout.paycom.uz".to_string()
}

fn default_click_checkout_url() -> String {
    "https://my.click.uz/services/pay".to_string()
}

fn default_uzs_per_usd() -> Decimal {
    Decimal::from(12_600)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe() -> StripeSettings {
        StripeSettings {
            api_key: "sk_test_abcd1234".to_string(),
            webhook_secret: "whsec_xyz789".to_string(),
            success_url: None,
            cancel_url: None,
            max_retries: default_max_retries(),
            api_base_url: default_stripe_api_base_url(),
        }
    }

    fn payme() -> PaymeSettings {
        PaymeSettings {
            merchant_id: "65a1b2c3d4e5f6a7b8c9d0e1".to_string(),
            secret_key: "payme-key".to_string(),
            login: default_payme_login(),
            checkout_url: default_payme_checkout_url(),
            return_url: None,
        }
    }

    fn click() -> ClickSettings {
        ClickSettings {
            service_id: "77".to_string(),
            merchant_id: "11".to_string(),
            secret_key: "click-secret".to_string(),
            checkout_url: default_click_checkout_url(),
            return_url: Some("https://courses.example.uz/payments/done".to_string()),
        }
    }

    fn config() -> PaymentConfig {
        PaymentConfig {
            stripe: stripe(),
            payme: payme(),
            click: click(),
            currency: CurrencySettings::default(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Stripe
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn stripe_mode_follows_key_prefix() {
        assert!(stripe().is_test_mode());
        let live = StripeSettings {
            api_key: "sk_live_xxx".to_string(),
            ..stripe()
        };
        assert!(live.is_live_mode());
        assert!(!live.is_test_mode());
    }

    #[test]
    fn stripe_requires_key_and_secret() {
        let no_key = StripeSettings {
            api_key: String::new(),
            ..stripe()
        };
        assert_eq!(
            no_key.validate(),
            Err(ValidationError::MissingRequired("payment.stripe.api_key"))
        );

        let no_secret = StripeSettings {
            webhook_secret: String::new(),
            ..stripe()
        };
        assert!(no_secret.validate().is_err());
    }

    #[test]
    fn stripe_prefixes_are_checked() {
        let publishable = StripeSettings {
            api_key: "pk_test_xxx".to_string(),
            ..stripe()
        };
        assert_eq!(publishable.validate(), Err(ValidationError::InvalidStripeKey));

        let bad_secret = StripeSettings {
            webhook_secret: "secret_xxx".to_string(),
            ..stripe()
        };
        assert_eq!(
            bad_secret.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn stripe_retry_budget_is_bounded() {
        let greedy = StripeSettings {
            max_retries: 10,
            ..stripe()
        };
        assert_eq!(greedy.validate(), Err(ValidationError::TooManyRetries));
    }

    #[test]
    fn redirect_urls_fall_back_to_public_base() {
        let settings = stripe();
        assert_eq!(
            settings.success_url_or("https://courses.example.uz/"),
            "https://courses.example.uz/payments/success"
        );
        assert_eq!(
            settings.cancel_url_or("https://courses.example.uz"),
            "https://courses.example.uz/payments/cancelled"
        );

        let explicit = StripeSettings {
            success_url: Some("https://pay.example.uz/ok".to_string()),
            ..stripe()
        };
        assert_eq!(explicit.success_url_or("ignored"), "https://pay.example.uz/ok");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payme, Click and Currency
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payme_requires_merchant_and_key() {
        let no_merchant = PaymeSettings {
            merchant_id: String::new(),
            ..payme()
        };
        assert_eq!(
            no_merchant.validate(),
            Err(ValidationError::MissingRequired("payment.payme.merchant_id"))
        );
        assert!(payme().validate().is_ok());
    }

    #[test]
    fn click_rejects_malformed_return_url() {
        let settings = ClickSettings {
            return_url: Some("not a url".to_string()),
            ..click()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::InvalidUrl("payment.click.return_url"))
        );
    }

    #[test]
    fn exchange_rate_must_be_positive() {
        let settings = CurrencySettings {
            uzs_per_usd: Decimal::ZERO,
        };
        assert_eq!(settings.validate(), Err(ValidationError::InvalidExchangeRate));
    }

    #[test]
    fn full_config_validates() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn production_rejects_plain_http_redirects() {
        let mut config = config();
        assert!(config.validate_for_production().is_ok());

        config.stripe.success_url = Some("http://courses.example.uz/ok".to_string());
        assert_eq!(
            config.validate_for_production(),
            Err(ValidationError::UrlMustBeHttps("payment.stripe.success_url"))
        );
    }
}
