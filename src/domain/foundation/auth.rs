//! Session identity as seen by the backend.
//!
//! Credential checks, session issuance and social login all happen in the
//! external auth provider. The backend only sees the session token it
//! issued, and the `SessionValidator` port turns that token into an
//! `AuthenticatedUser`.

use super::UserId;
use serde::Serialize;
use thiserror::Error;

/// Identity carried by a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
    /// `name` claim, when the provider sends one.
    pub display_name: Option<String>,
    pub email_verified: bool,
}

impl AuthenticatedUser {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: Option<String>,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
            email_verified,
        }
    }
}

/// Why a session token was not accepted.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Malformed token, bad signature or unexpected issuer/audience.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// The validator could not reach a decision (key material, network).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }
}
