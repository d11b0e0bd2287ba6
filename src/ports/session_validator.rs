//! Session validation port.
//!
//! The external auth provider issues sessions; this port turns the token the
//! browser presents into an `AuthenticatedUser`. Implementations must check
//! the signature and expiry, plus issuer and audience when configured.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for malformed tokens or bad signatures
/// - `AuthError::TokenExpired` for expired sessions
/// - `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw session token (without any "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::sync::Arc;

    struct SingleTokenValidator;

    #[async_trait]
    impl SessionValidator for SingleTokenValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            match token {
                "good" => Ok(AuthenticatedUser::new(
                    UserId::new("user-1").unwrap(),
                    "user@example.com",
                    None,
                    true,
                )),
                "old" => Err(AuthError::TokenExpired),
                _ => Err(AuthError::InvalidToken),
            }
        }
    }

    #[tokio::test]
    async fn validator_is_usable_as_trait_object() {
        let validator: Arc<dyn SessionValidator> = Arc::new(SingleTokenValidator);

        let user = validator.validate("good").await.unwrap();
        assert_eq!(user.id.as_str(), "user-1");

        assert!(matches!(
            validator.validate("old").await,
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            validator.validate("forged").await,
            Err(AuthError::InvalidToken)
        ));
    }
}
