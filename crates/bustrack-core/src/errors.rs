//! Application error type.
//!
//! Every failure that reaches the HTTP boundary is an [`AppError`]. The
//! [`ErrorCode`] decides the status code and the machine-readable `code`
//! field; the wrapped [`anyhow::Error`] carries the message.
//!
//! Wire shape:
//!
//! ```json
//! {"status":"error","code":"missing_permission","message":"Permission 'routes.write' required"}
//! ```

use std::fmt;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Closed set of error kinds surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    WrongTokenPurpose,
    RevokedToken,
    UserNotFound,
    AuthenticationRequired,
    InvalidCredentials,
    InsufficientRole,
    MissingPermission,
    AccessDenied,
    ValidationFailed,
    BadRequest,
    NotFound,
    Conflict,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::WrongTokenPurpose
            | Self::RevokedToken
            | Self::UserNotFound
            | Self::AuthenticationRequired
            | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole | Self::MissingPermission | Self::AccessDenied => {
                StatusCode::FORBIDDEN
            }
            Self::ValidationFailed | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::WrongTokenPurpose => "wrong_token_purpose",
            Self::RevokedToken => "revoked_token",
            Self::UserNotFound => "user_not_found",
            Self::AuthenticationRequired => "authentication_required",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InsufficientRole => "insufficient_role",
            Self::MissingPermission => "missing_permission",
            Self::AccessDenied => "access_denied",
            Self::ValidationFailed => "validation_failed",
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation violation. `path` locates the offending value inside the
/// request document, e.g. `["body", "capacity"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub path: Vec<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "error")]
    pub status: String,
    #[schema(example = "missing_token")]
    pub code: ErrorCode,
    #[schema(example = "Access token required")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
}

#[derive(Debug)]
pub struct AppError {
    pub code: ErrorCode,
    pub status: StatusCode,
    pub error: Error,
    pub details: Option<Vec<ErrorDetail>>,
}

impl AppError {
    pub fn new<E>(code: ErrorCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            code,
            status: code.status(),
            error: err.into(),
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, anyhow::anyhow!(message.into()))
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::Internal, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::NotFound, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::BadRequest, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::Conflict, err)
    }

    pub fn authentication_required() -> Self {
        Self::with_message(ErrorCode::AuthenticationRequired, "Authentication required")
    }

    pub fn validation(details: Vec<ErrorDetail>) -> Self {
        Self {
            details: Some(details),
            ..Self::with_message(ErrorCode::ValidationFailed, "Validation failed")
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_server_error() {
            error!(
                error.code = %self.code,
                error.message = %format!("{:#}", self.error),
                "Internal server error"
            );
            "Internal server error".to_string()
        } else {
            self.error.to_string()
        };

        let body = Json(ErrorBody {
            status: "error".to_string(),
            code: self.code,
            message,
            details: self.details,
        });

        (self.status, body).into_response()
    }
}

fn is_unique_violation(err: &Error) -> bool {
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        return db_err.is_unique_violation();
    }
    false
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        if is_unique_violation(&err) {
            AppError::with_message(ErrorCode::Conflict, "Resource already exists")
        } else {
            AppError::internal(err)
        }
    }
}
