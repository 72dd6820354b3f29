//! Standard JSON error body and status mapping shared by HTTP endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, DomainError, ErrorCode};

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

/// Maps a domain error to a status code and JSON body.
pub fn domain_error_response(error: DomainError) -> Response {
    let status = match error.code() {
        ErrorCode::ValidationFailed | ErrorCode::MalformedMessage => StatusCode::BAD_REQUEST,
        ErrorCode::NotAuthenticated | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
        ErrorCode::PublishFailed | ErrorCode::InternalError => {
            tracing::error!(error = %error, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let details = if error.details.is_empty() || status.is_server_error() {
        None
    } else {
        serde_json::to_value(&error.details).ok()
    };

    let body = ErrorResponse {
        code: error.code().to_string(),
        message: if status.is_server_error() {
            "Internal error".to_string()
        } else {
            error.message
        },
        details,
    };
    (status, Json(body)).into_response()
}

/// Maps an identity-token failure to 401, or 503 when the check itself failed.
pub fn auth_error_response(error: &AuthError) -> Response {
    if error.is_transient() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::unavailable(error.to_string())),
        )
            .into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::unauthorized(error.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_bad_request_with_details() {
        let response = domain_error_response(DomainError::validation("title", "Title cannot be empty"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn publish_failure_maps_to_500() {
        let response =
            domain_error_response(DomainError::new(ErrorCode::PublishFailed, "bridge down"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn expired_token_is_401_and_outage_is_503() {
        assert_eq!(
            auth_error_response(&AuthError::TokenExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_response(&AuthError::service_unavailable("down")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::bad_request("nope")).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json.get("details").is_none());
    }
}
