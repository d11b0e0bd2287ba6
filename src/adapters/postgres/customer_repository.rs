//! PostgreSQL implementation of CustomerRepository.

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{CustomerRepository, SaveResult};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>(
            "SELECT stripe_customer_id FROM user_stripe_customers WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find customer: {}", e)))
    }

    async fn find_user_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM user_stripe_customers WHERE stripe_customer_id = $1",
        )
        .bind(stripe_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find customer: {}", e)))?;

        user_id
            .map(|id| {
                UserId::new(id)
                    .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))
            })
            .transpose()
    }

    async fn save(
        &self,
        user_id: &UserId,
        stripe_customer_id: &str,
    ) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_stripe_customers (user_id, stripe_customer_id, created_at, updated_at)
            VALUES ($1, $2, now(), now())
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(stripe_customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save customer: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}
