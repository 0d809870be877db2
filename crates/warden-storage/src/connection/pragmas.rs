//! PRAGMA configuration applied to every connection.
//!
//! WAL mode, FULL sync by default, foreign keys on, 5s busy timeout.

use rusqlite::Connection;

use warden_core::errors::StorageError;

/// Apply durability and concurrency pragmas.
///
/// `synchronous_full` selects `synchronous = FULL`; otherwise `NORMAL`.
pub fn apply_pragmas(conn: &Connection, synchronous_full: bool) -> Result<(), StorageError> {
    let synchronous = if synchronous_full { "FULL" } else { "NORMAL" };
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = {synchronous};
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        "
    ))
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Whether the connection is in WAL mode. In-memory databases report `memory`.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}

/// Current `synchronous` level: 0 OFF, 1 NORMAL, 2 FULL, 3 EXTRA.
pub fn synchronous_level(conn: &Connection) -> Result<i64, StorageError> {
    conn.pragma_query_value(None, "synchronous", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}
