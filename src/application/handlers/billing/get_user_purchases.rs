//! GetUserPurchasesHandler - Query handler for a user's billing history.

use std::sync::Arc;

use super::load_entitlements;
use crate::domain::billing::{BillingError, Entitlements};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentRepository, SubscriptionRepository};

/// Query for the signed-in user's payments and subscriptions.
#[derive(Debug, Clone)]
pub struct GetUserPurchasesQuery {
    pub user_id: UserId,
}

/// Both lists, newest first.
pub type GetUserPurchasesResult = Entitlements;

pub struct GetUserPurchasesHandler {
    payments: Arc<dyn PaymentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl GetUserPurchasesHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            payments,
            subscriptions,
        }
    }

    pub async fn handle(
        &self,
        query: GetUserPurchasesQuery,
    ) -> Result<GetUserPurchasesResult, BillingError> {
        load_entitlements(
            self.payments.as_ref(),
            self.subscriptions.as_ref(),
            &query.user_id,
        )
        .await
        .map_err(|e| {
            tracing::error!(user_id = %query.user_id, error = %e, "Failed to load billing history");
            BillingError::infrastructure(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::purchase::test_support::PurchaseRecordBuilder;
    use crate::domain::billing::subscription::test_support::SubscriptionRecordBuilder;
    use crate::domain::foundation::{ErrorCode, Timestamp};

    fn handler(store: &Arc<InMemoryBillingStore>) -> GetUserPurchasesHandler {
        GetUserPurchasesHandler::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn returns_only_the_callers_rows_newest_first() {
        let store = Arc::new(InMemoryBillingStore::new());
        let now = Timestamp::now();
        store
            .insert(&PurchaseRecordBuilder::new("u1").product("Old").created_at(now.add_days(-3)).build())
            .await
            .unwrap();
        store
            .insert(&PurchaseRecordBuilder::new("u1").product("New").created_at(now).build())
            .await
            .unwrap();
        store
            .insert(&PurchaseRecordBuilder::new("u2").product("Theirs").build())
            .await
            .unwrap();
        store
            .create(&SubscriptionRecordBuilder::new("u1").plan("Basic").build())
            .await
            .unwrap();

        let result = handler(&store)
            .handle(GetUserPurchasesQuery {
                user_id: UserId::new("u1").unwrap(),
            })
            .await
            .unwrap();

        let names: Vec<_> = result.purchases().iter().map(|p| p.product_name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old"]);
        assert_eq!(result.subscriptions().len(), 1);
        assert_eq!(result.subscriptions()[0].plan_name, "Basic");
    }

    #[tokio::test]
    async fn user_without_rows_gets_empty_lists() {
        let store = Arc::new(InMemoryBillingStore::new());

        let result = handler(&store)
            .handle(GetUserPurchasesQuery {
                user_id: UserId::new("nobody").unwrap(),
            })
            .await
            .unwrap();

        assert!(result.purchases().is_empty());
        assert!(result.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_an_infrastructure_error() {
        let store = Arc::new(InMemoryBillingStore::new());
        store.set_unavailable(true);

        let err = handler(&store)
            .handle(GetUserPurchasesQuery {
                user_id: UserId::new("u1").unwrap(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.message(), "Internal server error");
    }
}
