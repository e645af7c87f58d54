//! Authentication: accounts, password hashing, bearer tokens and the
//! request extractors that guard protected routes.

mod accounts;
mod extractor;
mod password;
mod token;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{User, UserRepository};

pub use accounts::{Accounts, DEFAULT_ACCOUNTS};
pub use extractor::{AdminUser, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{fingerprint, short_fingerprint, Claims, IssuedToken, TokenKeys};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The signed bearer token.
    pub token: IssuedToken,
    /// The account that logged in.
    pub user: User,
}

/// Credential checks, token issuance and revocation.
#[derive(Debug, Clone)]
pub struct AuthService {
    accounts: Accounts,
    keys: TokenKeys,
}

impl AuthService {
    /// Assemble a service from its parts.
    #[must_use]
    pub fn new(accounts: Accounts, keys: TokenKeys) -> Self {
        Self { accounts, keys }
    }

    /// Build a service from configuration and a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable signing secret is configured.
    pub fn from_config(config: &Config, repo: Arc<dyn UserRepository>) -> Result<Self> {
        let secret = config.jwt_secret()?;
        let keys = TokenKeys::new(
            secret.as_bytes(),
            config.auth.issuer.clone(),
            config.token_ttl(),
        );
        Ok(Self::new(Accounts::new(repo, config.auth.bcrypt_cost), keys))
    }

    /// Account management.
    #[must_use]
    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    /// Token keys.
    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Check credentials and issue a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] on bad credentials, or a
    /// storage, hashing or signing error.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let user = self.accounts.check_credentials(username, password).await?;
        let token = self.keys.issue(&user.username, user.is_admin)?;
        info!(
            username = %user.username,
            token = %short_fingerprint(&token.token),
            "login succeeded"
        );
        Ok(LoginOutcome { token, user })
    }

    /// Validate a token, make sure it has not been revoked and that its
    /// account still exists.
    ///
    /// The returned `is_admin` is the account's current flag, not the one
    /// the token was issued with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenExpired`] or [`Error::TokenInvalid`] if the
    /// token is rejected.
    pub async fn authenticate(&self, token: &str) -> Result<Claims> {
        let mut claims = self.keys.validate(token)?;
        let repo = self.accounts.repository();

        if repo.is_revoked(&fingerprint(token)).await? {
            debug!(token = %short_fingerprint(token), "rejected revoked token");
            return Err(Error::token_invalid("token has been revoked"));
        }

        let Some(stored) = repo.find_user(&claims.sub).await? else {
            debug!(username = %claims.sub, "rejected token of deleted account");
            return Err(Error::token_invalid("account no longer exists"));
        };
        claims.is_admin = stored.user.is_admin;
        Ok(claims)
    }

    /// Revoke a token until its natural expiry.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn logout(&self, token: &str, claims: &Claims) -> Result<()> {
        self.accounts
            .repository()
            .revoke_token(&fingerprint(token), claims.expires_at())
            .await?;
        info!(username = %claims.sub, token = %short_fingerprint(token), "logged out");
        Ok(())
    }

    /// Load the account a token was issued to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] if the account was deleted since.
    pub async fn current_user(&self, claims: &Claims) -> Result<User> {
        self.accounts.get(&claims.sub).await
    }

    /// Drop revocations of tokens that have expired anyway.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn prune_revocations(&self) -> Result<usize> {
        self.accounts.repository().prune_revocations().await
    }
}
