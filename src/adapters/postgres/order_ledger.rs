//! PostgreSQL implementation of OrderLedger.
//!
//! Course purchases and subscription payments live in separate tables.
//! Reads go through the `orders_view` union; writes target the table that
//! owns the order's kind. Transitions are compare-and-set updates guarded
//! by `status = 'pending'`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    Currency, LedgerError, Order, OrderKind, OrderStatus, OrderSubject, PaymentProvider,
    TransitionOutcome,
};
use crate::domain::entitlement::InstructorPlan;
use crate::domain::foundation::{CourseId, OrderId, Timestamp, UserId};
use crate::ports::OrderLedger;

const ORDER_COLUMNS: &str = "id, kind, user_id, course_id, plan, provider, amount, currency, \
     transaction_id, status, created_at, updated_at, completed_at, failed_at";

pub struct PostgresOrderLedger {
    pool: PgPool,
}

impl PostgresOrderLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: &OrderId,
        target: OrderStatus,
    ) -> Result<TransitionOutcome, LedgerError> {
        let current = self
            .find_order(id)
            .await?
            .ok_or(LedgerError::NotFound(*id))?;
        if current.status == target {
            return Ok(TransitionOutcome::AlreadyApplied(current));
        }

        // Validates the move before touching the row.
        let now = Timestamp::now();
        let mut next = current.clone();
        let stamp_column = match target {
            OrderStatus::Completed => {
                next.complete(now)?;
                "completed_at"
            }
            OrderStatus::Failed => {
                next.fail(now)?;
                "failed_at"
            }
            OrderStatus::Pending => {
                return Err(LedgerError::InvalidTransition {
                    from: current.status,
                    to: target,
                })
            }
        };

        let sql = format!(
            "UPDATE {} SET status = $2, {} = $3, updated_at = $3 \
             WHERE id = $1 AND status = 'pending'",
            table_for(current.kind()),
            stamp_column
        );
        let result = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(target.as_str())
            .bind(now.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to transition order", e))?;

        if result.rows_affected() == 1 {
            return Ok(TransitionOutcome::Applied(next));
        }

        // Lost the race; report whatever the winner wrote.
        let stored = self
            .find_order(id)
            .await?
            .ok_or(LedgerError::NotFound(*id))?;
        if stored.status == target {
            Ok(TransitionOutcome::AlreadyApplied(stored))
        } else {
            Err(LedgerError::InvalidTransition {
                from: stored.status,
                to: target,
            })
        }
    }
}

fn table_for(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::CoursePurchase => "course_orders",
        OrderKind::SubscriptionPayment => "subscription_orders",
    }
}

fn db_error(context: &str, err: sqlx::Error) -> LedgerError {
    LedgerError::infrastructure(format!("{}: {}", context, err))
}

/// Row of `orders_view`.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    kind: String,
    user_id: String,
    course_id: Option<String>,
    plan: Option<String>,
    provider: String,
    amount: i64,
    currency: String,
    transaction_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = LedgerError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |field: &str, detail: String| {
            LedgerError::infrastructure(format!("Invalid {} in order {}: {}", field, id, detail))
        };

        let user_id =
            UserId::new(row.user_id.clone()).map_err(|e| corrupt("user_id", e.to_string()))?;
        let subject = match row.kind.as_str() {
            "course_purchase" => {
                let course_id = row
                    .course_id
                    .clone()
                    .ok_or_else(|| corrupt("course_id", "missing".to_string()))?;
                OrderSubject::Course {
                    user_id,
                    course_id: CourseId::new(course_id)
                        .map_err(|e| corrupt("course_id", e.to_string()))?,
                }
            }
            "subscription_payment" => {
                let plan = row
                    .plan
                    .as_deref()
                    .ok_or_else(|| corrupt("plan", "missing".to_string()))?;
                OrderSubject::Subscription {
                    user_id,
                    plan: plan
                        .parse::<InstructorPlan>()
                        .map_err(|e| corrupt("plan", e.to_string()))?,
                }
            }
            other => return Err(corrupt("kind", other.to_string())),
        };

        Ok(Order {
            id: OrderId::from_uuid(id),
            subject,
            provider: row
                .provider
                .parse::<PaymentProvider>()
                .map_err(|e| corrupt("provider", e.to_string()))?,
            amount: row.amount,
            currency: row
                .currency
                .parse::<Currency>()
                .map_err(|e| corrupt("currency", e.to_string()))?,
            transaction_id: row.transaction_id,
            status: row
                .status
                .parse::<OrderStatus>()
                .map_err(|e| corrupt("status", e.to_string()))?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            failed_at: row.failed_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl OrderLedger for PostgresOrderLedger {
    async fn create_order(
        &self,
        subject: OrderSubject,
        provider: PaymentProvider,
        amount: i64,
        currency: Currency,
    ) -> Result<Order, LedgerError> {
        let order = Order::new_pending(subject, provider, amount, currency, Timestamp::now());

        let (subject_column, subject_value) = match &order.subject {
            OrderSubject::Course { course_id, .. } => ("course_id", course_id.as_str()),
            OrderSubject::Subscription { plan, .. } => ("plan", plan.as_str()),
        };
        let sql = format!(
            r#"
            INSERT INTO {} (
                id, user_id, {}, provider, amount, currency, transaction_id,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
            table_for(order.kind()),
            subject_column
        );

        sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.user_id().as_str())
            .bind(subject_value)
            .bind(order.provider.as_str())
            .bind(order.amount)
            .bind(order.currency.code())
            .bind(&order.transaction_id)
            .bind(order.status.as_str())
            .bind(order.created_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create order", e))?;

        tracing::debug!(order_id = %order.id, kind = order.kind().as_str(), "Order created");
        Ok(order)
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let sql = format!("SELECT {} FROM orders_view WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load order", e))?;
        row.map(Order::try_from).transpose()
    }

    async fn find_by_provider_transaction(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Order>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM orders_view WHERE provider = $1 AND transaction_id = $2",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(provider.as_str())
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load order by transaction", e))?;
        row.map(Order::try_from).transpose()
    }

    async fn mark_completed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError> {
        self.transition(id, OrderStatus::Completed).await
    }

    async fn mark_failed(&self, id: &OrderId) -> Result<TransitionOutcome, LedgerError> {
        self.transition(id, OrderStatus::Failed).await
    }

    async fn update_provider_transaction_id(
        &self,
        id: &OrderId,
        transaction_id: &str,
    ) -> Result<Order, LedgerError> {
        let mut order = self
            .find_order(id)
            .await?
            .ok_or(LedgerError::NotFound(*id))?;
        let now = Timestamp::now();
        order.attach_provider_transaction(transaction_id, now)?;

        let sql = format!(
            "UPDATE {} SET transaction_id = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'pending'",
            table_for(order.kind())
        );
        let result = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(transaction_id)
            .bind(now.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to record provider transaction", e))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotPending(*id));
        }
        Ok(order)
    }

    async fn list_by_provider_between(
        &self,
        provider: PaymentProvider,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Order>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM orders_view \
             WHERE provider = $1 AND created_at BETWEEN $2 AND $3 \
             ORDER BY created_at ASC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(provider.as_str())
            .bind(from.as_datetime())
            .bind(to.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list orders", e))?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM orders_view WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list orders", e))?;
        rows.into_iter().map(Order::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> OrderRow {
        let now = Utc::now();
        OrderRow {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            user_id: "student-1".to_string(),
            course_id: Some("rust-101".to_string()),
            plan: Some("pro".to_string()),
            provider: "payme".to_string(),
            amount: 100_000,
            currency: "UZS".to_string(),
            transaction_id: "pm-1".to_string(),
            status: "completed".to_string(),
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
            failed_at: None,
        }
    }

    #[test]
    fn course_row_maps_to_course_order() {
        let order = Order::try_from(row("course_purchase")).unwrap();
        assert_eq!(order.kind(), OrderKind::CoursePurchase);
        assert_eq!(order.provider, PaymentProvider::Payme);
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.completed_at.is_some());
    }

    #[test]
    fn subscription_row_maps_plan() {
        let order = Order::try_from(row("subscription_payment")).unwrap();
        assert!(matches!(order.subject, OrderSubject::Subscription { .. }));
    }

    #[test]
    fn corrupt_rows_are_infrastructure_errors() {
        let mut bad = row("course_purchase");
        bad.status = "refunded".to_string();
        assert!(matches!(
            Order::try_from(bad),
            Err(LedgerError::Infrastructure(_))
        ));

        assert!(Order::try_from(row("gift_card")).is_err());
    }

    #[test]
    fn each_kind_has_its_own_table() {
        assert_eq!(table_for(OrderKind::CoursePurchase), "course_orders");
        assert_eq!(table_for(OrderKind::SubscriptionPayment), "subscription_orders");
    }
}
