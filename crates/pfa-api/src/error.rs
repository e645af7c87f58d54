//! Error types for pfa-api.
//!
//! This module defines the error type shared by the storage, auth, client and
//! server layers. HTTP-facing failures are translated into response envelopes
//! by [`crate::api::ApiError`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pfa-api operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Account Errors ===
    /// A user with this name already exists.
    #[error("user already exists: {username}")]
    UserExists {
        /// The conflicting username.
        username: String,
    },

    /// No user with this name exists.
    #[error("user not found: {username}")]
    UserNotFound {
        /// The missing username.
        username: String,
    },

    /// The username/password pair did not match an account.
    #[error("invalid username or password")]
    AuthenticationFailed,

    /// Username or password failed validation.
    #[error("invalid credentials: {message}")]
    InvalidCredentials {
        /// Description of the validation failure.
        message: String,
    },

    // === Token Errors ===
    /// The token's `exp` claim is in the past.
    #[error("token has expired")]
    TokenExpired,

    /// The token is malformed, badly signed, from another issuer, or revoked.
    #[error("invalid token: {reason}")]
    TokenInvalid {
        /// Why the token was rejected.
        reason: String,
    },

    /// Token signing failed.
    #[error("failed to sign token: {0}")]
    TokenSign(String),

    /// Password hashing or verification failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    // === Client Errors ===
    /// The HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error envelope.
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response envelope.
        message: String,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for pfa-api operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a token rejection with a reason.
    #[must_use]
    pub fn token_invalid(reason: impl Into<String>) -> Self {
        Self::TokenInvalid {
            reason: reason.into(),
        }
    }

    /// Create a credential validation error.
    #[must_use]
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error means the token is expired.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Check if this error rejects a token for any reason.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::TokenInvalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TokenExpired;
        assert_eq!(err.to_string(), "token has expired");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_token_predicates() {
        assert!(Error::TokenExpired.is_token_expired());
        assert!(Error::TokenExpired.is_token_error());
        assert!(Error::token_invalid("bad signature").is_token_error());
        assert!(!Error::token_invalid("bad signature").is_token_expired());
        assert!(!Error::internal("x").is_token_error());
    }

    #[test]
    fn test_user_exists_display() {
        let err = Error::UserExists {
            username: "admin".to_string(),
        };
        assert_eq!(err.to_string(), "user already exists: admin");
    }

    #[test]
    fn test_user_not_found_display() {
        let err = Error::UserNotFound {
            username: "ghost".to_string(),
        };
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            status: 401,
            message: "Invalid username or password".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid username or password"));
    }

    #[test]
    fn test_authentication_failed_display() {
        assert_eq!(
            Error::AuthenticationFailed.to_string(),
            "invalid username or password"
        );
    }

    #[test]
    fn test_invalid_credentials_display() {
        let err = Error::invalid_credentials("username must not be empty");
        assert!(err.to_string().contains("username must not be empty"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::config_validation("port must be greater than 0");
        assert!(err.to_string().contains("port must be greater than 0"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("address in use"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_bcrypt_error() {
        let err: Error = bcrypt::BcryptError::CostNotAllowed(2).into();
        assert!(matches!(err, Error::PasswordHash(_)));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
