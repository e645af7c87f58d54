//! Password hashing.
//!
//! bcrypt is CPU-bound, so both directions run on the blocking thread pool.

use crate::error::{Error, Result};

/// Hash a password with the given bcrypt cost.
///
/// # Errors
///
/// Returns an error if bcrypt rejects the cost or the task fails.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::internal(format!("hashing task failed: {e}")))?
        .map_err(Error::from)
}

/// Check a password against a bcrypt hash.
///
/// # Errors
///
/// Returns an error if the stored hash is malformed or the task fails. A
/// wrong password is `Ok(false)`.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::internal(format!("verification task failed: {e}")))?
        .map_err(Error::from)
}
