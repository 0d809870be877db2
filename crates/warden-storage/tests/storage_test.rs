//! SQLite audit trail and statistics persistence.

use std::sync::Arc;

use tempfile::TempDir;

use warden_analysis::ensemble::{StrategyStats, StrategyStatsTable};
use warden_analysis::fixes::FixOrchestrator;
use warden_analysis::rules::{Descriptor, FixAction, FixTemplate, Pattern, RuleRegistry};
use warden_analysis::{EnsembleScorer, SourceFile};
use warden_core::audit::{now_ms, replay_state, AuditEntry, AuditTrail, DecisionId, FixState};
use warden_core::config::{AuditConfig, FixPolicy, ScanConfig};
use warden_core::traits::CancellationToken;
use warden_core::types::{SafetyClass, Severity};
use warden_storage::connection::pragmas::{synchronous_level, verify_wal_mode};
use warden_storage::queries::strategy_stats::{load_strategy_stats, upsert_strategy_stats, StrategyStatsRow};
use warden_storage::{DatabaseManager, SqliteAuditTrail};

fn entry(id: &str, file: &str, from: Option<FixState>, to: FixState) -> AuditEntry {
    AuditEntry::transition(DecisionId::new(id), id, "batch-1", file, "no-eval", from, to)
}

#[test]
fn test_file_database_uses_wal_and_full_sync() {
    let dir = TempDir::new().unwrap();
    let db = DatabaseManager::open(&dir.path().join("audit.db")).unwrap();
    db.with_conn(|conn| {
        assert!(verify_wal_mode(conn)?);
        assert_eq!(synchronous_level(conn)?, 2);
        Ok(())
    })
    .unwrap();
    assert_eq!(db.schema_version().unwrap(), 2);
}

#[test]
fn test_config_selects_path_and_sync() {
    let dir = TempDir::new().unwrap();
    let config = AuditConfig {
        db_path: Some("state/warden.db".to_string()),
        synchronous_full: Some(false),
    };
    let db = DatabaseManager::open_from_config(dir.path(), &config).unwrap();
    assert!(dir.path().join("state/warden.db").exists());
    db.with_conn(|conn| {
        assert_eq!(synchronous_level(conn)?, 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.db");
    {
        let trail = SqliteAuditTrail::open(&path).unwrap();
        trail.record(&entry("d1", "a.py", None, FixState::Proposed)).unwrap();
        trail
            .record(&entry("d1", "a.py", Some(FixState::Proposed), FixState::Validated))
            .unwrap();
    }

    let trail = SqliteAuditTrail::open(&path).unwrap();
    let history = trail.replay(&DecisionId::new("d1")).unwrap();
    assert_eq!(replay_state(&history).unwrap(), Some(FixState::Validated));
    assert_eq!(trail.find_active_by_file("a.py").unwrap().len(), 1);
}

#[test]
fn test_entries_cannot_be_updated_or_deleted() {
    let trail = SqliteAuditTrail::in_memory().unwrap();
    trail.record(&entry("d1", "a.py", None, FixState::Proposed)).unwrap();

    let update = trail.database().with_conn(|conn| {
        conn.execute("UPDATE audit_entries SET to_state = 'confirmed'", [])
            .map_err(|e| warden_core::errors::StorageError::SqliteError {
                message: e.to_string(),
            })
    });
    assert!(update.unwrap_err().to_string().contains("append-only"));

    let delete = trail.database().with_conn(|conn| {
        conn.execute("DELETE FROM audit_entries", [])
            .map_err(|e| warden_core::errors::StorageError::SqliteError {
                message: e.to_string(),
            })
    });
    assert!(delete.is_err());
    assert_eq!(trail.len().unwrap(), 1);
}

#[test]
fn test_concurrent_records_get_unique_sequences() {
    let dir = TempDir::new().unwrap();
    let trail = SqliteAuditTrail::open(&dir.path().join("audit.db")).unwrap();

    std::thread::scope(|s| {
        for t in 0..8 {
            let trail = &trail;
            s.spawn(move || {
                for i in 0..25 {
                    let id = format!("d{t}-{i}");
                    trail
                        .record(&entry(&id, &format!("f{t}.py"), None, FixState::Proposed))
                        .unwrap();
                }
            });
        }
    });

    let all = trail.entries().unwrap();
    assert_eq!(all.len(), 200);
    assert!(all.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[test]
fn test_strategy_stats_round_trip() {
    let db = DatabaseManager::open_in_memory().unwrap();
    let table = StrategyStatsTable::new(["literal", "regex"], 0.9, 0.05);
    table.apply_feedback("regex", 2, 6).unwrap();

    let rows: Vec<StrategyStatsRow> = table
        .snapshots()
        .into_iter()
        .map(|(strategy, s)| StrategyStatsRow {
            strategy,
            files_scanned: s.files_scanned,
            findings: s.findings,
            failures: s.failures,
            elapsed_us: s.elapsed_us,
            hits: s.hits,
            false_positives: s.false_positives,
            weight: s.weight,
            updated_at: now_ms(),
        })
        .collect();
    db.with_conn(|conn| upsert_strategy_stats(conn, &rows)).unwrap();
    db.with_conn(|conn| upsert_strategy_stats(conn, &rows)).unwrap();

    let loaded = db.with_conn(load_strategy_stats).unwrap();
    assert_eq!(loaded, rows);

    let restored = StrategyStatsTable::new(["literal", "regex"], 0.9, 0.05);
    for row in loaded {
        assert!(restored.restore(
            &row.strategy,
            StrategyStats {
                files_scanned: row.files_scanned,
                findings: row.findings,
                failures: row.failures,
                elapsed_us: row.elapsed_us,
                hits: row.hits,
                false_positives: row.false_positives,
                weight: row.weight,
            },
        ));
    }
    assert_eq!(restored.weight("regex"), table.weight("regex"));
}

/// A real batch recorded through SQLite replays as a legal chain.
#[test]
fn test_orchestrator_writes_durable_history() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app.py");
    std::fs::write(&source, "result = eval(data)\n").unwrap();

    let registry = Arc::new(
        RuleRegistry::from_patterns([Pattern::new("no-eval", "security", Severity::High)
            .detect(Descriptor::regex(r"\beval\("))
            .with_fix(FixTemplate::new(
                FixAction::Replace {
                    with: "literal_eval(".to_string(),
                },
                SafetyClass::Simple,
            ))])
        .unwrap(),
    );
    let scorer = EnsembleScorer::from_config(registry, &ScanConfig::default()).unwrap();
    let file = SourceFile::read(&source).unwrap().unwrap();
    let candidates = scorer.scan(&[file]).fix_candidates();
    assert_eq!(candidates.len(), 1);

    let db_path = dir.path().join("audit.db");
    let trail = Arc::new(SqliteAuditTrail::open(&db_path).unwrap());
    let report = FixOrchestrator::new(trail)
        .run(candidates, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.confirmed(), 1);
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "result = literal_eval(data)\n"
    );

    let reopened = SqliteAuditTrail::open(&db_path).unwrap();
    let decision = report.decisions().next().unwrap();
    let history = reopened
        .replay(&DecisionId::new(decision.decision_id.clone()))
        .unwrap();
    assert_eq!(replay_state(&history).unwrap(), Some(FixState::Confirmed));
    assert!(history[2].before_hash.is_some() && history[2].after_hash.is_some());
}

/// Unfinished decisions persisted by an earlier process block a new batch
/// on the same file until recovery closes them.
#[test]
fn test_durable_unfinished_decisions_block_batch() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app.py");
    std::fs::write(&source, "result = eval(data)\n").unwrap();
    let file = source.to_string_lossy().into_owned();
    let db_path = dir.path().join("audit.db");

    {
        let trail = SqliteAuditTrail::open(&db_path).unwrap();
        trail
            .record(&entry("batch-1:c1", &file, None, FixState::Proposed))
            .unwrap();
        trail
            .record(&entry("batch-1:c1", &file, Some(FixState::Proposed), FixState::Validated))
            .unwrap();
    }

    let registry = Arc::new(
        RuleRegistry::from_patterns([Pattern::new("no-eval", "security", Severity::High)
            .detect(Descriptor::regex(r"\beval\("))
            .with_fix(FixTemplate::new(
                FixAction::Replace {
                    with: "literal_eval(".to_string(),
                },
                SafetyClass::Simple,
            ))])
        .unwrap(),
    );
    let scorer = EnsembleScorer::from_config(registry, &ScanConfig::default()).unwrap();
    let scan = || {
        let source_file = SourceFile::read(&source).unwrap().unwrap();
        scorer.scan(&[source_file]).fix_candidates()
    };

    let trail = Arc::new(SqliteAuditTrail::open(&db_path).unwrap());
    let orchestrator = FixOrchestrator::new(trail.clone());
    let blocked = orchestrator
        .run(scan(), &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(blocked.confirmed(), 0);
    assert!(!blocked.all_succeeded());
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "result = eval(data)\n");

    let recovery = orchestrator.recover(&file).unwrap();
    assert_eq!(recovery.interrupted, 1);
    assert!(trail.find_active_by_file(&file).unwrap().is_empty());

    let report = orchestrator
        .run(scan(), &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.confirmed(), 1);
    assert_eq!(
        std::fs::read_to_string(&source).unwrap(),
        "result = literal_eval(data)\n"
    );
}
