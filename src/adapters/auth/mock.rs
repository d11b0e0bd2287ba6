//! Mock session validator for testing.
//!
//! `MockSessionValidator` implements the `SessionValidator` port over a
//! fixed token table, so handler and HTTP tests run without signed tokens.
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_test_user("valid-token", UserId::new("user-123")?);
//!
//! let user = validator.validate("valid-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Tokens not in the table return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set.
    forced_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Registers `token` for a verified user whose email is derived from the id.
    pub fn with_test_user(self, token: impl Into<String>, user_id: UserId) -> Self {
        let email = format!("{}@test.example.com", user_id.as_str());
        self.with_user(token, AuthenticatedUser::new(user_id, email, None, true))
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .forced_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self
            .forced_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .forced_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
