//! Authentication types for the domain layer.
//!
//! These types represent an authenticated user extracted from an identity
//! token. They have **no external dependencies** - any token issuer can
//! populate them via the `SessionValidator` port.

use super::{TeamId, UserId};
use thiserror::Error;

/// Authenticated user extracted from a validated identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier (token subject).
    pub id: UserId,

    /// Display name if the token carries one.
    pub display_name: Option<String>,

    /// Teams the token grants room access to. `None` means the token does
    /// not restrict team membership.
    pub teams: Option<Vec<TeamId>>,
}

impl AuthenticatedUser {
    /// Creates an authenticated user without team restrictions.
    pub fn new(id: UserId, display_name: Option<String>) -> Self {
        Self {
            id,
            display_name,
            teams: None,
        }
    }

    /// Restricts the user to the given teams.
    pub fn with_teams(mut self, teams: Vec<TeamId>) -> Self {
        self.teams = Some(teams);
        self
    }

    /// Returns true if this user may join the given team room.
    pub fn can_join(&self, team_id: &TeamId) -> bool {
        match &self.teams {
            Some(teams) => teams.contains(team_id),
            None => true,
        }
    }
}

/// Authentication errors that can occur during token validation.
///
/// These errors are **domain-centric** - they describe what went wrong
/// from the application's perspective, not the token issuer's.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// The token is valid but was issued for a different user than claimed.
    #[error("Token subject does not match the claimed user")]
    SubjectMismatch,

    /// User is authenticated but may not join the requested room.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::SubjectMismatch
        )
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
