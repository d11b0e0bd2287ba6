//! Session authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Settings shared with the external auth provider that issues sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret the session tokens are signed with
    pub session_secret: String,

    /// Expected `iss` claim, when the provider sets one
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected `aud` claim, when the provider sets one
    #[serde(default)]
    pub audience: Option<String>,

    /// Cookie consulted when no Bearer header is sent
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Production deployments need a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.session_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__SESSION_SECRET"));
        }
        if *environment == Environment::Production
            && self.session_secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ValidationError::SessionSecretTooShort);
        }
        let cookie_ok = !self.session_cookie.is_empty()
            && self
                .session_cookie
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !cookie_ok {
            return Err(ValidationError::InvalidSessionCookie);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            issuer: None,
            audience: None,
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_session_cookie() -> String {
    "session_token".to_string()
}
