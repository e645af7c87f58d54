//! Account management on top of a [`UserRepository`].

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::password::{hash_password, verify_password};
use crate::error::{Error, Result};
use crate::storage::{normalize_username, validate_password, User, UserRepository};

/// Accounts created by [`Accounts::seed_defaults`]: `(username, password, is_admin)`.
pub const DEFAULT_ACCOUNTS: &[(&str, &str, bool)] = &[("admin", "admin", true), ("user", "user", false)];

/// Hashed once, then verified against for logins naming an unknown account.
const DUMMY_PASSWORD: &str = "pfa-api-unknown-account";

/// User management: hashing, validation and credential checks.
#[derive(Clone)]
pub struct Accounts {
    repo: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
    dummy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for Accounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accounts")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl Accounts {
    /// Create an account manager.
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// The repository behind this manager.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repo
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`Error::UserExists`], or a storage error.
    pub async fn create(&self, username: &str, password: &str, is_admin: bool) -> Result<User> {
        let username = normalize_username(username)?;
        validate_password(password)?;
        let hash = hash_password(password, self.bcrypt_cost).await?;
        self.repo.create_user(&username, &hash, is_admin).await
    }

    /// Look up an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] or a storage error.
    pub async fn get(&self, username: &str) -> Result<User> {
        self.repo
            .find_user(username)
            .await?
            .map(|stored| stored.user)
            .ok_or_else(|| Error::UserNotFound {
                username: username.to_string(),
            })
    }

    /// List all accounts.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] or a storage error.
    pub async fn delete(&self, username: &str) -> Result<()> {
        if self.repo.delete_user(username).await? {
            Ok(())
        } else {
            Err(Error::UserNotFound {
                username: username.to_string(),
            })
        }
    }

    /// Change an account's password.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`Error::UserNotFound`], or a storage error.
    pub async fn set_password(&self, username: &str, password: &str) -> Result<()> {
        validate_password(password)?;
        let hash = hash_password(password, self.bcrypt_cost).await?;
        if self.repo.set_password(username, &hash).await? {
            Ok(())
        } else {
            Err(Error::UserNotFound {
                username: username.to_string(),
            })
        }
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] if the account is unknown or
    /// the password is wrong.
    pub async fn check_credentials(&self, username: &str, password: &str) -> Result<User> {
        let Some(stored) = self.repo.find_user(username).await? else {
            verify_password(password, self.dummy_hash().await?).await?;
            debug!(%username, "login for unknown user");
            return Err(Error::AuthenticationFailed);
        };

        if verify_password(password, &stored.password_hash).await? {
            Ok(stored.user)
        } else {
            debug!(%username, "wrong password");
            Err(Error::AuthenticationFailed)
        }
    }

    async fn dummy_hash(&self) -> Result<&str> {
        self.dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.bcrypt_cost))
            .await
            .map(String::as_str)
    }

    /// Create [`DEFAULT_ACCOUNTS`] if no accounts exist.
    ///
    /// Returns `true` if accounts were created.
    ///
    /// # Errors
    ///
    /// Returns a storage or hashing error.
    pub async fn seed_defaults(&self) -> Result<bool> {
        if self.repo.count_users().await? > 0 {
            return Ok(false);
        }

        for (username, password, is_admin) in DEFAULT_ACCOUNTS {
            self.create(username, password, *is_admin).await?;
        }
        warn!(
            "created default accounts admin/admin and user/user; change their passwords \
             or set auth.seed_default_users = false"
        );
        Ok(true)
    }
}
