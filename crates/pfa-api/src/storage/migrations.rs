//! Schema versioning for the user database.
//!
//! The version lives in the `metadata` table; each step up to
//! [`CURRENT_VERSION`] runs once, in order.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    run_migrations(conn, version)
}

/// Read the stored schema version; 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    stored.map_or(Ok(0), |value| {
        value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        })
    })
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Apply every step after `from_version`, in order.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        info!(version, "applying schema migration");
        match version {
            1 => migrate_v1(conn)?,
            2 => migrate_v2(conn)?,
            _ => {
                return Err(Error::DatabaseMigration {
                    message: format!("unknown migration version: {version}"),
                })
            }
        }
    }
    Ok(())
}

/// Migration to version 1 (initial schema).
///
/// No-op: the base tables come from `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration to version 2: usernames compare case-insensitively.
///
/// Lowercases any names stored by version 1. Refuses to run if two
/// accounts differ only by case.
fn migrate_v2(conn: &Connection) -> Result<()> {
    let collisions: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT lower(username) FROM users GROUP BY lower(username) HAVING COUNT(*) > 1)",
        [],
        |row| row.get(0),
    )?;
    if collisions > 0 {
        return Err(Error::DatabaseMigration {
            message: format!("{collisions} usernames collide when lowercased"),
        });
    }

    conn.execute("UPDATE users SET username = lower(username)", [])?;
    set_schema_version(conn, 2)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        for table in ["users", "revoked_tokens", "metadata"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_revocation_index_created() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let indexes: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='revoked_tokens'",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.iter().any(|n| n.contains("expires")));
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();
        set_schema_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_migrate_v2_lowercases_usernames() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO users (username, password_hash, is_admin, created_at, updated_at)
             VALUES ('Counselor', 'x', 0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let name: String = conn
            .query_row("SELECT username FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "counselor");
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_migrate_v2_rejects_collisions() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();
        for name in ["Admin", "admin"] {
            conn.execute(
                "INSERT INTO users (username, password_hash, is_admin, created_at, updated_at)
                 VALUES (?1, 'x', 0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [name],
            )
            .unwrap();
        }

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("collide"));
    }
}
