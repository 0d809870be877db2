//! V001: append-only audit ledger.

pub const MIGRATION_SQL: &str = r#"
-- One row per decision transition. Rows are never updated or deleted.
CREATE TABLE IF NOT EXISTS audit_entries (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    decision_id TEXT NOT NULL,
    candidate_id TEXT NOT NULL,
    batch_id TEXT NOT NULL,
    file TEXT NOT NULL,
    rule TEXT NOT NULL,
    from_state TEXT,
    to_state TEXT NOT NULL,
    reason TEXT,
    before_hash TEXT,
    after_hash TEXT,
    actor TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    supersedes TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_audit_decision
    ON audit_entries(decision_id, sequence);
CREATE INDEX IF NOT EXISTS idx_audit_file
    ON audit_entries(file, sequence);
CREATE INDEX IF NOT EXISTS idx_audit_batch
    ON audit_entries(batch_id);

CREATE TRIGGER IF NOT EXISTS audit_entries_no_update
BEFORE UPDATE ON audit_entries
BEGIN
    SELECT RAISE(ABORT, 'audit_entries is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_entries_no_delete
BEFORE DELETE ON audit_entries
BEGIN
    SELECT RAISE(ABORT, 'audit_entries is append-only');
END;
"#;
