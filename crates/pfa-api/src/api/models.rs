//! Request and response bodies shared by the server and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::User;

/// Default message on success envelopes.
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The request succeeded.
    Success,
    /// The request failed; `message` says why.
    Error,
}

/// JSON wrapper around every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Success or error.
    pub status: Status,
    /// Human-readable message.
    pub message: String,
    /// Payload, absent on errors and on bare acknowledgements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Success envelope with the default message.
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    /// Success envelope without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: None,
        }
    }

    /// Error envelope.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            data: None,
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name.
    #[serde(default)]
    pub username: Option<String>,
    /// Plain-text password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Payload of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The account that logged in.
    pub user: User,
}

/// Body of `POST /auth/verify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Token to check.
    #[serde(default)]
    pub token: Option<String>,
}

/// Payload of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyData {
    /// Always true; invalid tokens produce an error envelope instead.
    pub valid: bool,
    /// Subject of the token.
    pub user_id: String,
    /// Admin flag from the token.
    pub is_admin: bool,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// New account name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Grant admin rights.
    #[serde(default)]
    pub is_admin: bool,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthData {
    /// Server version.
    pub version: String,
}
