//! ListOrdersHandler - a buyer's order history.

use std::sync::Arc;

use crate::domain::billing::{LedgerError, Order};
use crate::domain::foundation::UserId;
use crate::ports::OrderLedger;

#[derive(Debug, Clone)]
pub struct ListOrdersQuery {
    pub user_id: UserId,
}

pub struct ListOrdersHandler {
    ledger: Arc<dyn OrderLedger>,
}

impl ListOrdersHandler {
    pub fn new(ledger: Arc<dyn OrderLedger>) -> Self {
        Self { ledger }
    }

    /// Newest first.
    pub async fn handle(&self, query: ListOrdersQuery) -> Result<Vec<Order>, LedgerError> {
        self.ledger.list_for_user(&query.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderLedger;
    use crate::domain::billing::{Currency, OrderSubject, PaymentProvider};
    use crate::domain::entitlement::InstructorPlan;

    #[tokio::test]
    async fn returns_only_the_callers_orders() {
        let ledger = Arc::new(InMemoryOrderLedger::new());
        let mine = UserId::new("user-a").unwrap();
        let theirs = UserId::new("user-b").unwrap();
        for user in [&mine, &theirs] {
            ledger
                .create_order(
                    OrderSubject::Subscription {
                        user_id: user.clone(),
                        plan: InstructorPlan::Basic,
                    },
                    PaymentProvider::Payme,
                    99_000,
                    Currency::Uzs,
                )
                .await
                .unwrap();
        }

        let handler = ListOrdersHandler::new(ledger);
        let orders = handler
            .handle(ListOrdersQuery {
                user_id: mine.clone(),
            })
            .await
            .unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].user_id(), &mine);
    }
}
