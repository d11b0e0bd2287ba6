//! PostgreSQL implementation of PaymentRepository.

use crate::domain::billing::{PaymentStatus, PurchaseRecord};
use crate::domain::foundation::{DomainError, PurchaseId, Timestamp, UserId};
use crate::ports::{PaymentRepository, SaveResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: String,
    product_name: String,
    amount: i64,
    currency: String,
    status: String,
    stripe_session_id: String,
    stripe_payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PurchaseRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PurchaseRecord {
            id: PurchaseId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            product_name: row.product_name,
            amount: row.amount,
            currency: row.currency,
            status: PaymentStatus::parse(&row.status)
                .map_err(|e| DomainError::database(format!("Invalid payment status: {}", e)))?,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &PurchaseRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, stripe_session_id, stripe_payment_intent_id,
                amount, currency, status, product_name, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (stripe_session_id) DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(&payment.stripe_session_id)
        .bind(&payment.stripe_payment_intent_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.product_name)
        .bind(payment.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert payment: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PurchaseRecord>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, product_name, amount, currency, status,
                   stripe_session_id, stripe_payment_intent_id, created_at
            FROM payments
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list payments: {}", e)))?;

        rows.into_iter().map(PurchaseRecord::try_from).collect()
    }
}
