//! Schema versioning for the `SQLite` backend.
//!
//! The base tables are created idempotently on open; numbered steps in
//! [`MIGRATIONS`] then bring older databases forward inside one transaction.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Ordered migration steps as `(target_version, sql)`.
///
/// Version 1 is the base schema from `SCHEMA_STATEMENTS`, so its body is empty.
const MIGRATIONS: &[(i32, &str)] = &[(1, "")];

/// Create the base schema and apply any pending migrations.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails, or if the database
/// was written by a newer schema version.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }
    Ok(())
}

/// Read the schema version, 0 for a fresh database.
pub(crate) fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn run_migrations(conn: &mut Connection, from_version: i32) -> Result<()> {
    let tx = conn.transaction()?;
    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > from_version) {
        debug!("Applying schema migration {}", version);
        if !sql.is_empty() {
            tx.execute_batch(sql).map_err(|e| Error::DatabaseMigration {
                message: format!("migration {version} failed: {e}"),
            })?;
        }
        set_schema_version(&tx, version)?;
    }
    tx.commit()?;
    info!(
        "Migrated schema from version {} to {}",
        from_version, CURRENT_VERSION
    );
    Ok(())
}
