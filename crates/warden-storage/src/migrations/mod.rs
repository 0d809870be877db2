//! Schema migrations using PRAGMA user_version.

pub mod v001_audit;
pub mod v002_strategy_stats;

use rusqlite::Connection;

use warden_core::errors::StorageError;

/// Latest schema version this build knows.
pub const LATEST_VERSION: u32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })?;

    if current_version > LATEST_VERSION {
        return Err(StorageError::MigrationFailed {
            version: current_version,
            message: format!("database is newer than this build (v{LATEST_VERSION})"),
        });
    }

    let migrations: &[(&str, u32)] = &[
        (v001_audit::MIGRATION_SQL, 1),
        (v002_strategy_stats::MIGRATION_SQL, 2),
    ];

    for (sql, version) in migrations {
        if current_version < *version {
            conn.execute_batch(sql).map_err(|e| StorageError::MigrationFailed {
                version: *version,
                message: e.to_string(),
            })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, "applied migration");
        }
    }

    Ok(())
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}
