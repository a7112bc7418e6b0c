// ============================================================================
// Kami API - Error Responses
// File: crates/kami-api/src/error.rs
// ============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kami_core::DomainError;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::UserNotFound
            | DomainError::ChannelNotFound
            | DomainError::CardNotFound
            | DomainError::ActivationCodeNotFound
            | DomainError::OrderNotFound => ApiError::NotFound(message),

            DomainError::InvalidCredentials
            | DomainError::InvalidToken(_)
            | DomainError::UserNotActive => ApiError::Unauthorized(message),

            DomainError::Forbidden(_)
            | DomainError::RegistrationDisabled
            | DomainError::CannotDeleteAdmin => ApiError::Forbidden(message),

            DomainError::UsernameAlreadyExists(_)
            | DomainError::EmailAlreadyExists(_)
            | DomainError::ChannelNameAlreadyExists(_)
            | DomainError::CardNameAlreadyExists(_)
            | DomainError::OrderAlreadyCompleted => ApiError::Conflict(message),

            DomainError::InvalidCodeStatus(_)
            | DomainError::CodeChannelMismatch
            | DomainError::ProxyNotBound
            | DomainError::OutOfStock(_)
            | DomainError::InvalidVerificationCode
            | DomainError::PasswordTooShort
            | DomainError::PasswordTooLong
            | DomainError::ValidationError(_) => ApiError::BadRequest(message),

            DomainError::PasswordHashError(_)
            | DomainError::TokenGenerationError(_)
            | DomainError::MailError(_)
            | DomainError::CacheError(_)
            | DomainError::DatabaseError(_)
            | DomainError::InternalError(_) => ApiError::InternalError(message),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "TOO_MANY_REQUESTS",
                "Too many attempts, try again later".to_string(),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(code, &message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_mapping() {
        assert!(matches!(ApiError::from(DomainError::CardNotFound), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from(DomainError::InvalidCredentials), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from(DomainError::CannotDeleteAdmin), ApiError::Forbidden(_)));
        assert!(matches!(ApiError::from(DomainError::OrderAlreadyCompleted), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from(DomainError::ProxyNotBound), ApiError::BadRequest(_)));
        assert!(matches!(
            ApiError::from(DomainError::DatabaseError("x".into())),
            ApiError::InternalError(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::TooManyRequests.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Conflict("dup".into()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
