//! Crash recovery from leftover backups.

use std::sync::Arc;

use tempfile::TempDir;

use warden_analysis::{FixOrchestrator, InMemoryAuditTrail};
use warden_core::audit::{replay_state, AuditEntry, AuditTrail, DecisionId, FixState};
use warden_core::types::ContentHash;

const ORIGINAL: &str = "x = eval(a)\ny = eval(b)\n";
const PARTIAL: &str = "x = ast.literal_eval(a)\ny = ast.literal_eval(b)\n";

fn chain(trail: &InMemoryAuditTrail, id: &str, file: &str, states: &[FixState]) {
    let mut from = None;
    for &to in states {
        let mut entry = AuditEntry::transition(DecisionId::new(id), id, "batch-1", file, "no-eval", from, to);
        if to == FixState::Applied {
            entry = entry.with_hashes(
                Some(ContentHash::of_str(ORIGINAL)),
                Some(ContentHash::of_str(PARTIAL)),
            );
        }
        trail.record(&entry).unwrap();
        from = Some(to);
    }
}

/// Applied decisions roll back, pending ones are rejected, confirmed ones
/// from the same batch are superseded, and the backup is restored.
#[test]
fn test_recover_restores_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.py");
    let file = path.to_string_lossy().replace('\\', "/");
    std::fs::write(&path, PARTIAL).unwrap();

    let trail = Arc::new(InMemoryAuditTrail::new());
    let orchestrator = FixOrchestrator::new(trail.clone());
    std::fs::write(orchestrator.backup_path(&file), ORIGINAL).unwrap();

    use FixState::*;
    chain(&trail, "batch-1:c1", &file, &[Proposed, Validated, Applied, Confirmed]);
    chain(&trail, "batch-1:c2", &file, &[Proposed, Validated, Applied]);
    chain(&trail, "batch-1:c3", &file, &[Proposed]);

    let report = orchestrator.recover(&file).unwrap();
    assert!(report.backup_found);
    assert!(report.restored);
    assert_eq!(report.rolled_back, 1);
    assert_eq!(report.interrupted, 1);
    assert_eq!(report.superseded, 1);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), ORIGINAL);
    assert!(!orchestrator.backup_path(&file).exists());
    assert!(trail.find_active_by_file(&file).unwrap().is_empty());

    let c2 = trail.replay(&DecisionId::new("batch-1:c2")).unwrap();
    assert_eq!(replay_state(&c2).unwrap(), Some(RolledBack));
    let last = c2.last().unwrap();
    assert_eq!(last.before_hash, Some(ContentHash::of_str(PARTIAL)));
    assert_eq!(last.after_hash, Some(ContentHash::of_str(ORIGINAL)));

    let correction = trail.replay(&DecisionId::new("batch-1:c1~recovery")).unwrap();
    assert_eq!(correction.len(), 2);
    assert_eq!(correction[0].supersedes, Some(DecisionId::new("batch-1:c1")));
    assert_eq!(replay_state(&correction).unwrap(), Some(Rejected));

    let c1 = trail.replay(&DecisionId::new("batch-1:c1")).unwrap();
    assert_eq!(c1.len(), 4, "terminal decisions are never extended");
}

/// A backup with no unfinished decisions is discarded without restoring.
#[test]
fn test_recover_discards_orphan_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.py");
    let file = path.to_string_lossy().replace('\\', "/");
    std::fs::write(&path, PARTIAL).unwrap();

    let orchestrator = FixOrchestrator::new(Arc::new(InMemoryAuditTrail::new()));
    std::fs::write(orchestrator.backup_path(&file), ORIGINAL).unwrap();

    let report = orchestrator.recover(&file).unwrap();
    assert!(report.backup_found);
    assert!(!report.restored);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), PARTIAL);
    assert!(!orchestrator.backup_path(&file).exists());
}

/// No backup means nothing to do.
#[test]
fn test_recover_without_backup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.py");
    std::fs::write(&path, ORIGINAL).unwrap();

    let orchestrator = FixOrchestrator::new(Arc::new(InMemoryAuditTrail::new()));
    let report = orchestrator.recover(&path.to_string_lossy()).unwrap();
    assert!(!report.backup_found);
    assert_eq!(report.rolled_back + report.interrupted + report.superseded, 0);
}

/// Without a backup, unfinished decisions that never touched the file are
/// still closed so later batches are not blocked.
#[test]
fn test_recover_without_backup_closes_pending_decisions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.py");
    let file = path.to_string_lossy().replace('\\', "/");
    std::fs::write(&path, ORIGINAL).unwrap();

    let trail = Arc::new(InMemoryAuditTrail::new());
    use FixState::*;
    chain(&trail, "batch-1:c1", &file, &[Proposed, Validated]);

    let orchestrator = FixOrchestrator::new(trail.clone());
    let report = orchestrator.recover(&file).unwrap();
    assert!(!report.backup_found);
    assert_eq!(report.interrupted, 1);
    assert!(trail.find_active_by_file(&file).unwrap().is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), ORIGINAL);
}
