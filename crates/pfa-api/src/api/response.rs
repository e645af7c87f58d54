//! Mapping results onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::models::Envelope;
use crate::error::Error;

pub(crate) const MSG_NO_INPUT: &str = "No input data provided";
pub(crate) const MSG_CREDENTIALS_REQUIRED: &str = "Username and password are required";
pub(crate) const MSG_CREDENTIALS_TOO_LONG: &str = "Username or password is too long";
pub(crate) const MSG_BAD_CREDENTIALS: &str = "Invalid username or password";
pub(crate) const MSG_TOKEN_REQUIRED: &str = "Token is required";
pub(crate) const MSG_TOKEN_EXPIRED: &str = "Token has expired";
pub(crate) const MSG_TOKEN_INVALID: &str = "Invalid token";
pub(crate) const MSG_AUTH_MISSING: &str = "Authentication token is missing";
pub(crate) const MSG_AUTH_EXPIRED: &str = "Authentication token has expired";
pub(crate) const MSG_AUTH_INVALID: &str = "Invalid authentication token";
pub(crate) const MSG_ADMIN_REQUIRED: &str = "Admin privileges required";
pub(crate) const MSG_USER_EXISTS: &str = "User already exists";
pub(crate) const MSG_USER_NOT_FOUND: &str = "User not found";
pub(crate) const MSG_RATE_LIMITED: &str = "Too many requests, please retry later";
pub(crate) const MSG_NOT_FOUND: &str = "Resource not found";
pub(crate) const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub(crate) const MSG_INTERNAL: &str = "Internal server error";

/// An error envelope with its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Message placed in the envelope.
    pub message: String,
}

impl ApiError {
    /// Build an error response.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 429 Too Many Requests.
    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, MSG_RATE_LIMITED)
    }

    /// Rejection for a failed bearer guard.
    ///
    /// Token errors keep their expired/invalid distinction; anything else is
    /// passed through [`From<Error>`].
    pub fn from_bearer(err: Error) -> Self {
        match err {
            Error::TokenExpired => Self::unauthorized(MSG_AUTH_EXPIRED),
            Error::TokenInvalid { .. } => Self::unauthorized(MSG_AUTH_INVALID),
            other => other.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidCredentials { message } => Self::bad_request(message),
            Error::AuthenticationFailed => Self::unauthorized(MSG_BAD_CREDENTIALS),
            Error::TokenExpired => Self::unauthorized(MSG_TOKEN_EXPIRED),
            Error::TokenInvalid { .. } => Self::unauthorized(MSG_TOKEN_INVALID),
            Error::UserExists { .. } => Self::new(StatusCode::CONFLICT, MSG_USER_EXISTS),
            Error::UserNotFound { .. } => Self::not_found(MSG_USER_NOT_FOUND),
            other => {
                tracing::error!(error = %other, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::error(self.message))).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// 200 with `data`.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope::success(data))).into_response()
}

/// 201 with `data`.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::success(data))).into_response()
}

/// 200 with only a message.
pub fn message(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(Envelope::message(message))).into_response()
}
