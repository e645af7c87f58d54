//! Async access to account storage for request handlers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Storage, StoredUser, User};
use crate::error::{Error, Result};

/// Abstraction over account persistence for the authentication flows.
///
/// Handlers run on the async runtime; implementations must not block it.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up an account with its password hash.
    async fn find_user(&self, username: &str) -> Result<Option<StoredUser>>;

    /// Insert a new account with an already hashed password.
    async fn create_user(&self, username: &str, password_hash: &str, is_admin: bool)
        -> Result<User>;

    /// List all accounts ordered by username.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Delete an account, returning whether it existed.
    async fn delete_user(&self, username: &str) -> Result<bool>;

    /// Replace an account's password hash, returning whether it existed.
    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool>;

    /// Count accounts.
    async fn count_users(&self) -> Result<i64>;

    /// Mark a token fingerprint as revoked until `expires_at`.
    async fn revoke_token(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Check whether a token fingerprint is revoked.
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool>;

    /// Delete revocations that have outlived their tokens.
    async fn prune_revocations(&self) -> Result<usize>;
}

/// [`UserRepository`] backed by [`Storage`], running queries on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    storage: Arc<Storage>,
}

impl SqliteUserRepository {
    /// Wrap a storage handle.
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || f(&storage))
            .await
            .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_user(&self, username: &str) -> Result<Option<StoredUser>> {
        let username = username.to_string();
        self.blocking(move |s| s.find_user(&username)).await
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        self.blocking(move |s| s.create_user(&username, &password_hash, is_admin))
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.blocking(Storage::list_users).await
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        self.blocking(move |s| s.delete_user(&username)).await
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        self.blocking(move |s| s.set_password(&username, &password_hash))
            .await
    }

    async fn count_users(&self) -> Result<i64> {
        self.blocking(Storage::count_users).await
    }

    async fn revoke_token(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let fingerprint = fingerprint.to_string();
        self.blocking(move |s| s.revoke_token(&fingerprint, expires_at))
            .await
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool> {
        let fingerprint = fingerprint.to_string();
        self.blocking(move |s| s.is_revoked(&fingerprint)).await
    }

    async fn prune_revocations(&self) -> Result<usize> {
        self.blocking(Storage::prune_revocations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SqliteUserRepository {
        SqliteUserRepository::new(Arc::new(Storage::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repo();
        repo.create_user("Admin", "hash", true).await.unwrap();

        let stored = repo.find_user("admin").await.unwrap().unwrap();
        assert!(stored.user.is_admin);
        assert_eq!(stored.password_hash, "hash");
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let repo = repo();
        repo.create_user("a", "h", false).await.unwrap();
        repo.create_user("b", "h", false).await.unwrap();

        assert!(repo.delete_user("a").await.unwrap());
        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "b");
    }

    #[tokio::test]
    async fn test_revocation_roundtrip() {
        let repo = repo();
        let expires = Utc::now() + chrono::Duration::minutes(5);

        repo.revoke_token("fp", expires).await.unwrap();
        assert!(repo.is_revoked("fp").await.unwrap());
        assert_eq!(repo.prune_revocations().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_password() {
        let repo = repo();
        repo.create_user("u", "old", false).await.unwrap();
        assert!(repo.set_password("u", "new").await.unwrap());
        assert_eq!(
            repo.find_user("u").await.unwrap().unwrap().password_hash,
            "new"
        );
    }
}
