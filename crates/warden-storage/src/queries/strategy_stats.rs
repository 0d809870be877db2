//! Queries for `strategy_stats`.

use rusqlite::{params, Connection};

use warden_core::errors::StorageError;

use crate::connection::writer::with_immediate_transaction;

/// Persisted statistics for one detector strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyStatsRow {
    pub strategy: String,
    pub files_scanned: u64,
    pub findings: u64,
    pub failures: u64,
    pub elapsed_us: u64,
    pub hits: f64,
    pub false_positives: f64,
    pub weight: f64,
    pub updated_at: u64,
}

/// Insert or replace every row in one transaction.
pub fn upsert_strategy_stats(conn: &Connection, rows: &[StrategyStatsRow]) -> Result<(), StorageError> {
    with_immediate_transaction(conn, |tx| {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO strategy_stats
                    (strategy, files_scanned, findings, failures, elapsed_us,
                     hits, false_positives, weight, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(strategy) DO UPDATE SET
                    files_scanned = excluded.files_scanned,
                    findings = excluded.findings,
                    failures = excluded.failures,
                    elapsed_us = excluded.elapsed_us,
                    hits = excluded.hits,
                    false_positives = excluded.false_positives,
                    weight = excluded.weight,
                    updated_at = excluded.updated_at",
            )
            .map_err(|e| StorageError::SqliteError {
                message: e.to_string(),
            })?;
        for row in rows {
            stmt.execute(params![
                row.strategy,
                row.files_scanned as i64,
                row.findings as i64,
                row.failures as i64,
                row.elapsed_us as i64,
                row.hits,
                row.false_positives,
                row.weight,
                row.updated_at as i64,
            ])
            .map_err(|e| StorageError::SqliteError {
                message: format!("upsert stats for {}: {e}", row.strategy),
            })?;
        }
        Ok(())
    })
}

/// All rows sorted by strategy id.
pub fn load_strategy_stats(conn: &Connection) -> Result<Vec<StrategyStatsRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT strategy, files_scanned, findings, failures, elapsed_us,
                    hits, false_positives, weight, updated_at
             FROM strategy_stats ORDER BY strategy",
        )
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StrategyStatsRow {
                strategy: row.get(0)?,
                files_scanned: row.get::<_, i64>(1)? as u64,
                findings: row.get::<_, i64>(2)? as u64,
                failures: row.get::<_, i64>(3)? as u64,
                elapsed_us: row.get::<_, i64>(4)? as u64,
                hits: row.get(5)?,
                false_positives: row.get(6)?,
                weight: row.get(7)?,
                updated_at: row.get::<_, i64>(8)? as u64,
            })
        })
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    let loaded = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        });
    loaded
}
