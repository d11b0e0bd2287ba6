//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `jwt` - HS256 session tokens signed with a shared secret
//! - `mock` - Token table for tests

mod jwt;
mod mock;

pub use jwt::{JwtConfig, JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;
