//! Custom error types for the API service
//!
//! Every failure a handler can produce funnels through `ApiError`, the
//! single error-formatting boundary. Operational errors carry their message
//! to the client; unexpected errors are logged and reduced to a generic
//! message unless the service runs in development mode.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::StoreError;
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client payload or parameter failed validation
    #[error("{0}")]
    Validation(String),

    /// No bearer token on a protected route
    #[error("Please log in to get access")]
    Unauthenticated,

    /// Token signature or shape is invalid
    #[error("Invalid token. Please log in again.")]
    InvalidToken,

    /// Token has expired
    #[error("Token is expired. Please log in again.")]
    ExpiredToken,

    /// The principal behind a valid token no longer exists
    #[error("The user belonging to this token does no longer exist")]
    PrincipalGone,

    /// Credentials changed after the token was issued
    #[error("User has recently changed password. Please log in again!")]
    CredentialsChanged,

    /// Login failed
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Principal lacks the role or ownership for this action
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// Entity lookup by id came up empty
    #[error("No {0} found with that ID")]
    NotFound(&'static str),

    /// A unique field value is already taken
    #[error("Duplicate field value: {0}. Please use another one!")]
    Duplicate(String),

    /// No route matched the request
    #[error("Can't find {0} on this server")]
    UnknownRoute(String),

    /// Outbound email delivery failed
    #[error("There was an error sending the email. Try again later!")]
    EmailSend,

    /// Anything unexpected
    #[error("Something went very wrong. That's all we know.")]
    Internal(anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Duplicate(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated
            | ApiError::InvalidToken
            | ApiError::ExpiredToken
            | ApiError::PrincipalGone
            | ApiError::CredentialsChanged
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ApiError::EmailSend | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(detail) => ApiError::Duplicate(detail),
            other => ApiError::Internal(other.into()),
        }
    }
}

/// Whether detailed errors should be exposed to clients. Read once from
/// `APP_ENV`.
pub fn development_mode() -> bool {
    static MODE: OnceLock<bool> = OnceLock::new();
    *MODE.get_or_init(|| {
        std::env::var("APP_ENV")
            .map(|v| v == "development")
            .unwrap_or(false)
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let status_word = if status.is_server_error() {
            "error"
        } else {
            "fail"
        };

        let message = match &self {
            ApiError::Internal(err) => {
                error!("unexpected error: {err:#}");
                if development_mode() {
                    format!("{err:#}")
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "status": status_word,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Duplicate("name".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ExpiredToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::CredentialsChanged.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("bootcamp").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_duplicate_translates_to_duplicate() {
        let err: ApiError = StoreError::Duplicate("users_email_key".into()).into();
        assert!(matches!(err, ApiError::Duplicate(_)));
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(
            ApiError::NotFound("bootcamp").to_string(),
            "No bootcamp found with that ID"
        );
    }
}
