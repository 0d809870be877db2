//! BEGIN IMMEDIATE transactions on the writer connection.

use rusqlite::Connection;

use warden_core::errors::StorageError;

/// Run `f` inside a `BEGIN IMMEDIATE` transaction, taking the database
/// write lock up front. Commits when `f` succeeds, rolls back otherwise.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Connection) -> Result<T, StorageError>,
{
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| StorageError::SqliteError {
            message: format!("failed to begin immediate transaction: {e}"),
        })?;

    match f(conn) {
        Ok(result) => {
            if let Err(e) = conn.execute_batch("COMMIT") {
                rollback(conn);
                return Err(StorageError::SqliteError {
                    message: format!("failed to commit: {e}"),
                });
            }
            Ok(result)
        }
        Err(e) => {
            rollback(conn);
            Err(e)
        }
    }
}

fn rollback(conn: &Connection) {
    if conn.is_autocommit() {
        return;
    }
    if let Err(e) = conn.execute_batch("ROLLBACK") {
        tracing::error!(error = %e, "rollback of immediate transaction failed");
    }
}
