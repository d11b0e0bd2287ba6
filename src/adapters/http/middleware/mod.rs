//! HTTP middleware for axum.
//!
//! - `auth` - Session middleware and authentication extractors

pub mod auth;

pub use auth::{
    auth_middleware, AuthRejection, AuthState, OptionalAuth, RequireAuth, DEFAULT_SESSION_COOKIE,
};
