//! HS256 JWT adapter for identity-token validation.
//!
//! Tokens are signed with a secret shared between the identity issuer and
//! the relay. Claims mapped onto `AuthenticatedUser`:
//!
//! - `sub` - user id (required)
//! - `name` - display name (optional)
//! - `teams` - team ids the user may join (optional; absent means unrestricted)
//! - `exp` - expiry (required)
//! - `iss` - checked only when an issuer is configured

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, TeamId, Timestamp, UserId};
use crate::ports::SessionValidator;

/// Claims carried by relay identity tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

impl IdentityClaims {
    /// Claims for `user_id` expiring `ttl_secs` from now.
    pub fn new(user_id: &UserId, ttl_secs: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: Timestamp::now().plus_secs(ttl_secs).as_unix_secs(),
            iss: None,
            name: None,
            teams: None,
        }
    }

    pub fn with_teams(mut self, teams: &[TeamId]) -> Self {
        self.teams = Some(teams.iter().map(ToString::to_string).collect());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    fn into_user(self) -> Result<AuthenticatedUser, AuthError> {
        let id = UserId::new(self.sub).map_err(|_| AuthError::InvalidToken)?;
        let user = AuthenticatedUser::new(id, self.name);
        match self.teams {
            Some(teams) => {
                let teams = teams
                    .into_iter()
                    .map(TeamId::new)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| AuthError::InvalidToken)?;
                Ok(user.with_teams(teams))
            }
            None => Ok(user),
        }
    }
}

/// Validates HS256-signed identity tokens.
pub struct JwtSessionValidator {
    secret: Secret<String>,
    issuer: Option<String>,
}

impl JwtSessionValidator {
    pub fn new(secret: Secret<String>, issuer: Option<String>) -> Self {
        Self { secret, issuer }
    }

    /// Signs claims with the same secret. Used by trusted issuers and tests.
    pub fn sign(&self, claims: &IdentityClaims) -> Result<String, AuthError> {
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign identity token");
            AuthError::service_unavailable("token signing failed")
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        let data = decode::<IdentityClaims>(token, &key, &self.validation()).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Identity token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in identity token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Identity token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        data.claims.into_user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(Secret::new("test-secret".to_string()), None)
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn valid_token_maps_claims_to_user() {
        let validator = validator();
        let team = TeamId::new("team-a").unwrap();
        let mut claims = IdentityClaims::new(&user(), 60).with_teams(&[team.clone()]);
        claims.name = Some("Ada".to_string());

        let authenticated = validator.validate(&validator.sign(&claims).unwrap()).await.unwrap();

        assert_eq!(authenticated.id, user());
        assert_eq!(authenticated.display_name.as_deref(), Some("Ada"));
        assert!(authenticated.can_join(&team));
        assert!(!authenticated.can_join(&TeamId::new("team-b").unwrap()));
    }

    #[tokio::test]
    async fn token_without_teams_is_unrestricted() {
        let validator = validator();
        let token = validator.sign(&IdentityClaims::new(&user(), 60)).unwrap();

        let authenticated = validator.validate(&token).await.unwrap();

        assert!(authenticated.can_join(&TeamId::new("any").unwrap()));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let validator = validator();
        let token = validator.sign(&IdentityClaims::new(&user(), -120)).unwrap();

        assert_eq!(validator.validate(&token).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let other = JwtSessionValidator::new(Secret::new("other".to_string()), None);
        let token = other.sign(&IdentityClaims::new(&user(), 60)).unwrap();

        assert_eq!(validator().validate(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let validator = JwtSessionValidator::new(
            Secret::new("test-secret".to_string()),
            Some("https://id.example.com".to_string()),
        );
        let wrong = validator
            .sign(&IdentityClaims::new(&user(), 60).with_issuer("https://evil.example.com"))
            .unwrap();
        let right = validator
            .sign(&IdentityClaims::new(&user(), 60).with_issuer("https://id.example.com"))
            .unwrap();

        assert_eq!(validator.validate(&wrong).await, Err(AuthError::InvalidToken));
        assert!(validator.validate(&right).await.is_ok());
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert_eq!(validator().validate("not-a-jwt").await, Err(AuthError::InvalidToken));
    }
}
