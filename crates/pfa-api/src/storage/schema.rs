//! `SQLite` schema definitions for pfa-api.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the revoked token table.
///
/// Tokens are identified by fingerprint, never stored verbatim.
pub const CREATE_REVOKED_TOKENS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS revoked_tokens (
    fingerprint TEXT PRIMARY KEY,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to index revocations by expiry for pruning.
pub const CREATE_REVOKED_EXPIRY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens(expires_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_REVOKED_TOKENS_TABLE,
    CREATE_REVOKED_EXPIRY_INDEX,
    CREATE_METADATA_TABLE,
];
