//! Queries for the append-only `audit_entries` table.

use rusqlite::{params, Connection, Row};

use warden_core::audit::{Actor, AuditEntry, DecisionId, FixState};
use warden_core::errors::StorageError;
use warden_core::types::ContentHash;

const COLUMNS: &str = "sequence, decision_id, candidate_id, batch_id, file, rule, from_state, \
                       to_state, reason, before_hash, after_hash, actor, timestamp_ms, supersedes";

fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

/// Raw column values of one row, before enum and hash parsing.
#[derive(Debug, Clone)]
struct AuditRow {
    sequence: i64,
    decision_id: String,
    candidate_id: String,
    batch_id: String,
    file: String,
    rule: String,
    from_state: Option<String>,
    to_state: String,
    reason: Option<String>,
    before_hash: Option<String>,
    after_hash: Option<String>,
    actor: String,
    timestamp_ms: i64,
    supersedes: Option<String>,
}

impl AuditRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sequence: row.get(0)?,
            decision_id: row.get(1)?,
            candidate_id: row.get(2)?,
            batch_id: row.get(3)?,
            file: row.get(4)?,
            rule: row.get(5)?,
            from_state: row.get(6)?,
            to_state: row.get(7)?,
            reason: row.get(8)?,
            before_hash: row.get(9)?,
            after_hash: row.get(10)?,
            actor: row.get(11)?,
            timestamp_ms: row.get(12)?,
            supersedes: row.get(13)?,
        })
    }

    fn into_entry(self) -> Result<AuditEntry, StorageError> {
        let bad = |what: &str, value: &str| StorageError::Serialization {
            message: format!("audit row #{}: invalid {what} '{value}'", self.sequence),
        };
        let state = |s: &str| FixState::parse_str(s).ok_or_else(|| bad("state", s));
        let hash = |h: &Option<String>| -> Result<Option<ContentHash>, StorageError> {
            h.as_deref()
                .map(|s| ContentHash::from_hex(s).ok_or_else(|| bad("hash", s)))
                .transpose()
        };

        Ok(AuditEntry {
            sequence: self.sequence as u64,
            from: self.from_state.as_deref().map(state).transpose()?,
            to: state(&self.to_state)?,
            before_hash: hash(&self.before_hash)?,
            after_hash: hash(&self.after_hash)?,
            actor: Actor::parse_str(&self.actor).ok_or_else(|| bad("actor", &self.actor))?,
            decision_id: DecisionId(self.decision_id),
            candidate_id: self.candidate_id,
            batch_id: self.batch_id,
            file: self.file,
            rule: self.rule,
            reason: self.reason,
            timestamp_ms: self.timestamp_ms as u64,
            supersedes: self.supersedes.map(DecisionId),
        })
    }
}

fn collect(conn: &Connection, sql: &str, param: Option<&str>) -> Result<Vec<AuditEntry>, StorageError> {
    let mut stmt = conn.prepare_cached(sql).map_err(sqlite_err)?;
    let rows = match param {
        Some(p) => stmt.query_map(params![p], AuditRow::from_row),
        None => stmt.query_map([], AuditRow::from_row),
    }
    .map_err(sqlite_err)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.map_err(sqlite_err)?.into_entry()?);
    }
    Ok(entries)
}

/// Append one entry and return its sequence number.
pub fn insert_entry(conn: &Connection, entry: &AuditEntry) -> Result<u64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO audit_entries
            (decision_id, candidate_id, batch_id, file, rule, from_state, to_state,
             reason, before_hash, after_hash, actor, timestamp_ms, supersedes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            entry.decision_id.as_str(),
            entry.candidate_id,
            entry.batch_id,
            entry.file,
            entry.rule,
            entry.from.map(|s| s.name()),
            entry.to.name(),
            entry.reason,
            entry.before_hash.map(|h| h.to_hex()),
            entry.after_hash.map(|h| h.to_hex()),
            entry.actor.name(),
            entry.timestamp_ms as i64,
            entry.supersedes.as_ref().map(|d| d.as_str()),
        ])
    })
    .map_err(sqlite_err)?;
    Ok(conn.last_insert_rowid() as u64)
}

/// Transition history of one decision in append order.
pub fn entries_for_decision(conn: &Connection, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, StorageError> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM audit_entries WHERE decision_id = ?1 ORDER BY sequence"),
        Some(decision_id.as_str()),
    )
}

/// Every entry touching `file`, in append order.
pub fn entries_for_file(conn: &Connection, file: &str) -> Result<Vec<AuditEntry>, StorageError> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM audit_entries WHERE file = ?1 ORDER BY sequence"),
        Some(file),
    )
}

/// Latest entry of each decision on `file` whose state is not terminal.
pub fn active_for_file(conn: &Connection, file: &str) -> Result<Vec<AuditEntry>, StorageError> {
    let latest = collect(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM audit_entries
             WHERE sequence IN (
                 SELECT MAX(sequence) FROM audit_entries WHERE file = ?1 GROUP BY decision_id
             )
             ORDER BY sequence"
        ),
        Some(file),
    )?;
    Ok(latest.into_iter().filter(|e| !e.to.is_terminal()).collect())
}

pub fn all_entries(conn: &Connection) -> Result<Vec<AuditEntry>, StorageError> {
    collect(
        conn,
        &format!("SELECT {COLUMNS} FROM audit_entries ORDER BY sequence"),
        None,
    )
}

pub fn count_entries(conn: &Connection) -> Result<u64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM audit_entries", [], |row| row.get::<_, i64>(0))
        .map(|n| n as u64)
        .map_err(sqlite_err)
}
