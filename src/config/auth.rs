//! Authentication configuration

use secrecy::Secret;
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Minimum HS256 secret length accepted outside development.
pub const MIN_SECRET_LEN: usize = 32;

/// Identity token and producer key settings.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret for identity tokens
    pub jwt_secret: String,

    /// Expected `iss` claim, if any
    #[serde(default)]
    pub jwt_issuer: Option<String>,

    /// Key producers present in `x-producer-key`. Ingestion is open when unset.
    #[serde(default)]
    pub producer_api_key: Option<String>,
}

impl AuthConfig {
    pub fn jwt_secret(&self) -> Secret<String> {
        Secret::new(self.jwt_secret.clone())
    }

    pub fn producer_api_key(&self) -> Option<Secret<String>> {
        self.producer_api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|k| Secret::new(k.clone()))
    }

    /// Validate authentication configuration
    ///
    /// Production requires a long secret and a producer key.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }

        if *environment == Environment::Production {
            if self.jwt_secret.len() < MIN_SECRET_LEN {
                return Err(ValidationError::SecretTooShort {
                    min: MIN_SECRET_LEN,
                });
            }
            if self.producer_api_key().is_none() {
                return Err(ValidationError::MissingRequired("AUTH__PRODUCER_API_KEY"));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field(
                "producer_api_key",
                &self.producer_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
