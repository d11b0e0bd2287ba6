//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Rows are keyed by the provider subscription id. State changes carry the
//! emission time of their event so late deliveries cannot roll a row back.

use crate::domain::billing::{SubscriptionRecord, SubscriptionStateUpdate, SubscriptionStatus};
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::ports::{SaveResult, StateChange, SubscriptionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    stripe_subscription_id: String,
    stripe_customer_id: String,
    status: String,
    plan_name: String,
    plan_price: i64,
    plan_interval: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    cancel_at_period_end: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_event_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            plan_name: row.plan_name,
            plan_price: row.plan_price,
            plan_interval: row.plan_interval,
            status: SubscriptionStatus::parse(&row.status).map_err(|e| {
                DomainError::database(format!("Invalid subscription status: {}", e))
            })?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            last_event_at: Timestamp::from_datetime(row.last_event_at),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, stripe_subscription_id, stripe_customer_id, status,
           plan_name, plan_price, plan_interval, current_period_start,
           current_period_end, cancel_at_period_end, created_at, updated_at,
           last_event_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn create(&self, subscription: &SubscriptionRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_subscription_id, stripe_customer_id, status,
                plan_name, plan_price, plan_interval, current_period_start,
                current_period_end, cancel_at_period_end, created_at, updated_at,
                last_event_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (stripe_subscription_id) DO NOTHING
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(&subscription.stripe_subscription_id)
        .bind(&subscription.stripe_customer_id)
        .bind(subscription.status.as_str())
        .bind(&subscription.plan_name)
        .bind(subscription.plan_price)
        .bind(&subscription.plan_interval)
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.last_event_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert subscription: {}", e)))?;

        Ok(if result.rows_affected() > 0 {
            SaveResult::Inserted
        } else {
            SaveResult::AlreadyExists
        })
    }

    async fn update_state(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStateUpdate,
    ) -> Result<StateChange, DomainError> {
        // Same rule as SubscriptionRecord::accepts.
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                current_period_start = $3,
                current_period_end = $4,
                cancel_at_period_end = $5,
                updated_at = $6,
                last_event_at = $7
            WHERE stripe_subscription_id = $1
              AND last_event_at <= $7
              AND (status <> 'canceled' OR $2 = 'canceled')
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(update.status.as_str())
        .bind(update.current_period_start.as_datetime())
        .bind(update.current_period_end.as_datetime())
        .bind(update.cancel_at_period_end)
        .bind(update.updated_at.as_datetime())
        .bind(update.event_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        if result.rows_affected() > 0 {
            return Ok(StateChange::Applied);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE stripe_subscription_id = $1)",
        )
        .bind(stripe_subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        Ok(if exists {
            StateChange::Skipped
        } else {
            StateChange::NotFound
        })
    }

    async fn mark_canceled(
        &self,
        stripe_subscription_id: &str,
        event_at: Timestamp,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                updated_at = $3,
                last_event_at = GREATEST(last_event_at, $4)
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(SubscriptionStatus::Canceled.as_str())
        .bind(updated_at.as_datetime())
        .bind(event_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to cancel subscription: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_cancel_at_period_end(
        &self,
        stripe_subscription_id: &str,
        cancel_at_period_end: bool,
        updated_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET cancel_at_period_end = $2, updated_at = $3
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(cancel_at_period_end)
        .bind(updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to schedule cancellation: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE stripe_subscription_id = $1", SELECT_COLUMNS))
                .bind(stripe_subscription_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to find subscription: {}", e))
                })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn list_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list subscriptions: {}", e)))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }
}
