//! Recording stand-in for Stripe Checkout.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::ports::{
    HostedCheckoutGateway, HostedCheckoutRequest, HostedCheckoutSession, PaymentError,
    PaymentErrorCode,
};

/// Returns deterministic session URLs and remembers every request.
#[derive(Default)]
pub struct StubCheckoutGateway {
    requests: Mutex<Vec<HostedCheckoutRequest>>,
    failing: AtomicBool,
}

impl StubCheckoutGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail as an upstream outage would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<HostedCheckoutRequest> {
        self.requests
            .lock()
            .expect("StubCheckoutGateway: requests lock poisoned")
            .clone()
    }
}

#[async_trait]
impl HostedCheckoutGateway for StubCheckoutGateway {
    async fn create_session(
        &self,
        request: HostedCheckoutRequest,
    ) -> Result<HostedCheckoutSession, PaymentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentError::new(
                PaymentErrorCode::ProviderError,
                "stub checkout unavailable",
            ));
        }
        let id = format!("cs_test_{}", request.order_id.as_uuid().simple());
        self.requests
            .lock()
            .expect("StubCheckoutGateway: requests lock poisoned")
            .push(request);
        Ok(HostedCheckoutSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            id,
        })
    }
}
