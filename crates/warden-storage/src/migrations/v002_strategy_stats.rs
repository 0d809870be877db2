//! V002: strategy statistics snapshots.

pub const MIGRATION_SQL: &str = r#"
-- Latest statistics per detector strategy, upserted after scans and feedback.
CREATE TABLE IF NOT EXISTS strategy_stats (
    strategy TEXT PRIMARY KEY,
    files_scanned INTEGER NOT NULL DEFAULT 0,
    findings INTEGER NOT NULL DEFAULT 0,
    failures INTEGER NOT NULL DEFAULT 0,
    elapsed_us INTEGER NOT NULL DEFAULT 0,
    hits REAL NOT NULL DEFAULT 0,
    false_positives REAL NOT NULL DEFAULT 0,
    weight REAL NOT NULL DEFAULT 1.0,
    updated_at INTEGER NOT NULL
) STRICT;
"#;
