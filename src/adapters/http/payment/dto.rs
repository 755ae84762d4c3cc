//! HTTP DTOs for checkout, order history and provider callbacks.
//!
//! Request fields are optional on purpose: a missing field is reported as a
//! 400 with a readable message rather than a bare deserialization failure.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{Currency, Order, OrderKind, OrderStatus, OrderSubject, PaymentProvider};
use crate::domain::entitlement::InstructorPlan;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to buy a single course.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseCheckoutRequest {
    #[serde(default)]
    pub course_id: Option<String>,
    /// `stripe`, `payme` or `click`.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Request to pay for an instructor plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    /// `basic`, `pro` or `premium`.
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Where the browser should go to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub order_id: String,
}

/// One order as shown in the buyer's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<InstructorPlan>,
    pub provider: PaymentProvider,
    pub amount: i64,
    pub currency: Currency,
    pub status: OrderStatus,
    /// ISO 8601.
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        let kind = order.kind();
        let (course_id, plan) = match order.subject {
            OrderSubject::Course { course_id, .. } => (Some(course_id.to_string()), None),
            OrderSubject::Subscription { plan, .. } => (None, Some(plan)),
        };
        Self {
            id: order.id.to_string(),
            kind,
            course_id,
            plan,
            provider: order.provider,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            created_at: order.created_at.as_datetime().to_rfc3339(),
            completed_at: order.completed_at.map(|t| t.as_datetime().to_rfc3339()),
            failed_at: order.failed_at.map(|t| t.as_datetime().to_rfc3339()),
        }
    }
}

/// Order history of the current user, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
}

/// Acknowledgement returned to Stripe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CourseId, Timestamp, UserId};

    fn course_order() -> Order {
        Order::new_pending(
            OrderSubject::Course {
                user_id: UserId::new("user-1").unwrap(),
                course_id: CourseId::new("rust-101").unwrap(),
            },
            PaymentProvider::Payme,
            150_000,
            Currency::Uzs,
            Timestamp::from_unix_millis(1_705_276_800_000).unwrap(),
        )
    }

    #[test]
    fn checkout_request_tolerates_missing_fields() {
        let request: CourseCheckoutRequest = serde_json::from_str("{}").unwrap();
        assert!(request.course_id.is_none());
        assert!(request.provider.is_none());
    }

    #[test]
    fn order_view_flattens_course_subject() {
        let json = serde_json::to_value(OrderView::from(course_order())).unwrap();

        assert_eq!(json["kind"], "course_purchase");
        assert_eq!(json["course_id"], "rust-101");
        assert_eq!(json["provider"], "payme");
        assert_eq!(json["currency"], "UZS");
        assert_eq!(json["status"], "pending");
        assert!(json.get("plan").is_none());
        assert!(json.get("completed_at").is_none());
        assert!(json["created_at"].as_str().unwrap().starts_with("2024-01-15"));
    }

    #[test]
    fn order_view_carries_plan_for_subscriptions() {
        let mut order = course_order();
        order.subject = OrderSubject::Subscription {
            user_id: UserId::new("user-1").unwrap(),
            plan: InstructorPlan::Pro,
        };
        let json = serde_json::to_value(OrderView::from(order)).unwrap();

        assert_eq!(json["kind"], "subscription_payment");
        assert_eq!(json["plan"], "pro");
        assert!(json.get("course_id").is_none());
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("COURSE_NOT_FOUND", "missing")).unwrap();
        assert_eq!(json, serde_json::json!({"code": "COURSE_NOT_FOUND", "message": "missing"}));
    }
}
