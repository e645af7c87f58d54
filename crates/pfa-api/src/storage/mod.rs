//! Storage layer for pfa-api.
//!
//! This module provides `SQLite`-based persistent storage for user accounts
//! and revoked tokens.

pub mod migrations;
mod repository;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use repository::{SqliteUserRepository, UserRepository};

/// Longest accepted username, in bytes.
pub const MAX_USERNAME_LENGTH: usize = 128;

/// Longest accepted password, in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// An account as exposed by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Row identifier.
    pub id: i64,
    /// Lowercased login name.
    pub username: String,
    /// Whether the account passes the admin guard.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// An account together with its bcrypt hash, for credential checks.
#[derive(Debug, Clone)]
pub struct StoredUser {
    /// The public view of the account.
    pub user: User,
    /// bcrypt hash of the password.
    pub password_hash: String,
}

/// Normalize and validate a username.
///
/// Usernames are case-insensitive and stored lowercased.
///
/// # Errors
///
/// Returns [`Error::InvalidCredentials`] if the name is empty, too long, or
/// contains characters outside `[A-Za-z0-9_.-]`.
pub fn normalize_username(username: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid regex pattern"));

    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_credentials("username must not be empty"));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(Error::invalid_credentials(format!(
            "username exceeds {MAX_USERNAME_LENGTH} bytes"
        )));
    }
    if !pattern.is_match(trimmed) {
        return Err(Error::invalid_credentials(
            "username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Validate a new password.
///
/// # Errors
///
/// Returns [`Error::InvalidCredentials`] if the password is empty or too long.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::invalid_credentials("password must not be empty"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(Error::invalid_credentials(format!(
            "password exceeds {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Fixed-width UTC timestamp, so text comparison in SQL orders by time.
fn sortable_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Storage engine for accounts and token revocations.
///
/// The connection sits behind a mutex so one `Storage` can be shared across
/// request handlers.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection mutex poisoned"))
    }

    /// Insert a new account.
    ///
    /// The username is normalized first; the password must already be hashed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserExists`] if the name is taken, or a validation or
    /// database error.
    pub fn create_user(&self, username: &str, password_hash: &str, is_admin: bool) -> Result<User> {
        let username = normalize_username(username)?;
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let conn = self.conn()?;
        let inserted = conn.execute(
            r"
            INSERT INTO users (username, password_hash, is_admin, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(username) DO NOTHING
            ",
            params![username, password_hash, is_admin, now_str],
        )?;
        if inserted == 0 {
            return Err(Error::UserExists { username });
        }

        let id = conn.last_insert_rowid();
        debug!(id, %username, is_admin, "created user");
        Ok(User {
            id,
            username,
            is_admin,
            created_at: now,
        })
    }

    /// Look up an account with its password hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_user(&self, username: &str) -> Result<Option<StoredUser>> {
        let username = username.trim().to_ascii_lowercase();
        let conn = self.conn()?;
        let result = conn
            .query_row(
                r"
                SELECT id, username, is_admin, created_at, password_hash
                FROM users WHERE username = ?1
                ",
                [username],
                |row| {
                    Ok(StoredUser {
                        user: Self::row_to_user(row)?,
                        password_hash: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Look up an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.find_user(username)?.map(|stored| stored.user))
    }

    /// List all accounts ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, is_admin, created_at FROM users ORDER BY username ASC",
        )?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Delete an account.
    ///
    /// Returns `true` if an account was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let username = username.trim().to_ascii_lowercase();
        let affected = self
            .conn()?
            .execute("DELETE FROM users WHERE username = ?1", [&username])?;
        if affected > 0 {
            info!(%username, "deleted user");
        }
        Ok(affected > 0)
    }

    /// Replace an account's password hash.
    ///
    /// Returns `true` if the account exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let username = username.trim().to_ascii_lowercase();
        let affected = self.conn()?.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE username = ?3",
            params![password_hash, Utc::now().to_rfc3339(), username],
        )?;
        Ok(affected > 0)
    }

    /// Count accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_users(&self) -> Result<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Record a token fingerprint as revoked until `expires_at`.
    ///
    /// Revoking the same token twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn revoke_token(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR IGNORE INTO revoked_tokens (fingerprint, expires_at) VALUES (?1, ?2)",
            params![fingerprint, sortable_timestamp(expires_at)],
        )?;
        Ok(())
    }

    /// Check whether a token fingerprint has been revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_revoked(&self, fingerprint: &str) -> Result<bool> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM revoked_tokens WHERE fingerprint = ?1",
            [fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drop revocations whose tokens have expired anyway.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_revocations(&self) -> Result<usize> {
        self.prune_revocations_before(Utc::now())
    }

    fn prune_revocations_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn()?.execute(
            "DELETE FROM revoked_tokens WHERE expires_at < ?1",
            [sortable_timestamp(cutoff)],
        )?;
        if affected > 0 {
            info!("Pruned {} expired token revocations", affected);
        }
        Ok(affected)
    }

    /// Convert a database row to a User.
    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        let created_at: String = row.get(3)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            is_admin: row.get(2)?,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create in-memory storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = create_test_storage();
        assert_eq!(storage.path(), Path::new(":memory:"));
        assert_eq!(storage.count_users().unwrap(), 0);
    }

    #[test]
    fn test_create_and_get_user() {
        let storage = create_test_storage();
        let user = storage.create_user("Counselor", "hash", false).unwrap();
        assert_eq!(user.username, "counselor");
        assert!(!user.is_admin);

        let fetched = storage.get_user("COUNSELOR").unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.username, "counselor");
    }

    #[test]
    fn test_create_duplicate_user() {
        let storage = create_test_storage();
        storage.create_user("admin", "hash", true).unwrap();

        let err = storage.create_user("Admin", "other", false).unwrap_err();
        assert!(matches!(err, Error::UserExists { .. }));
        assert_eq!(storage.count_users().unwrap(), 1);
    }

    #[test]
    fn test_create_user_rejects_bad_name() {
        let storage = create_test_storage();
        assert!(storage.create_user("", "hash", false).is_err());
        assert!(storage.create_user("has space", "hash", false).is_err());
        assert!(storage
            .create_user(&"a".repeat(MAX_USERNAME_LENGTH + 1), "hash", false)
            .is_err());
    }

    #[test]
    fn test_find_user_includes_hash() {
        let storage = create_test_storage();
        storage.create_user("user", "$2b$04$hash", false).unwrap();

        let stored = storage.find_user("user").unwrap().unwrap();
        assert_eq!(stored.password_hash, "$2b$04$hash");
    }

    #[test]
    fn test_get_missing_user() {
        let storage = create_test_storage();
        assert!(storage.get_user("ghost").unwrap().is_none());
    }

    #[test]
    fn test_list_users_sorted() {
        let storage = create_test_storage();
        storage.create_user("zoe", "h", false).unwrap();
        storage.create_user("amir", "h", true).unwrap();

        let names: Vec<_> = storage
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["amir", "zoe"]);
    }

    #[test]
    fn test_delete_user() {
        let storage = create_test_storage();
        storage.create_user("temp", "h", false).unwrap();

        assert!(storage.delete_user("temp").unwrap());
        assert!(!storage.delete_user("temp").unwrap());
        assert!(storage.get_user("temp").unwrap().is_none());
    }

    #[test]
    fn test_set_password() {
        let storage = create_test_storage();
        storage.create_user("user", "old", false).unwrap();

        assert!(storage.set_password("user", "new").unwrap());
        assert_eq!(storage.find_user("user").unwrap().unwrap().password_hash, "new");
        assert!(!storage.set_password("ghost", "new").unwrap());
    }

    #[test]
    fn test_revoke_token() {
        let storage = create_test_storage();
        let expires = Utc::now() + Duration::hours(1);

        assert!(!storage.is_revoked("abc").unwrap());
        storage.revoke_token("abc", expires).unwrap();
        assert!(storage.is_revoked("abc").unwrap());

        // Idempotent
        storage.revoke_token("abc", expires).unwrap();
    }

    #[test]
    fn test_prune_revocations() {
        let storage = create_test_storage();
        storage
            .revoke_token("old", Utc::now() - Duration::hours(1))
            .unwrap();
        storage
            .revoke_token("live", Utc::now() + Duration::hours(1))
            .unwrap();

        assert_eq!(storage.prune_revocations().unwrap(), 1);
        assert!(!storage.is_revoked("old").unwrap());
        assert!(storage.is_revoked("live").unwrap());
    }

    #[test]
    fn test_prune_revocations_before_cutoff() {
        let storage = create_test_storage();
        let expires = Utc::now() + Duration::hours(1);
        storage.revoke_token("t", expires).unwrap();

        assert_eq!(
            storage
                .prune_revocations_before(expires + Duration::seconds(1))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Admin ").unwrap(), "admin");
        assert_eq!(normalize_username("dr.smith-2_x").unwrap(), "dr.smith-2_x");
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username("a/b").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("admin").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_open_on_disk_creates_parent() {
        let dir = std::env::temp_dir().join(format!("pfa-api-test-{}", std::process::id()));
        let path = dir.join("nested").join("users.db");

        let storage = Storage::open(&path).unwrap();
        storage.create_user("admin", "h", true).unwrap();
        drop(storage);

        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.count_users().unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_user_serializes_without_hash() {
        let storage = create_test_storage();
        let user = storage.create_user("admin", "secret-hash", true).unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"is_admin\":true"));
        assert!(!json.contains("secret-hash"));
    }
}
