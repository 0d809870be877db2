//! Fix orchestration end to end: scan real files, run batches against
//! them, inspect file contents and the audit trail.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use warden_analysis::ensemble::EnsembleScorer;
use warden_analysis::fixes::{
    ConflictResolution, FileOutcome, FixCandidate, FixOrchestrator, PolicyClause, RejectReason,
};
use warden_analysis::rules::{Descriptor, FixAction, FixTemplate, Invariant, Pattern, RuleRegistry};
use warden_analysis::source::SourceFile;
use warden_analysis::syntax::TreeSitterProvider;
use warden_analysis::InMemoryAuditTrail;
use warden_core::audit::{replay_state, AuditEntry, AuditTrail, DecisionId, FixState};
use warden_core::config::{FixConfig, FixPolicy, ScanConfig};
use warden_core::errors::{AuditError, FixError};
use warden_core::events::{BatchCompleteEvent, EventDispatcher, FixTransitionEvent, WardenEventHandler};
use warden_core::traits::{Cancellable, CancellationToken};
use warden_core::types::{ContentHash, SafetyClass, Severity};

const CORS_APP: &str = "app = Flask(__name__)\nCORS(app, origins=\"*\")\n";

fn no_wildcard_cors() -> Pattern {
    Pattern::new("no-wildcard-cors", "security", Severity::Critical)
        .detect(Descriptor::regex(r#"origins="\*""#).with_confidence(0.9))
        .with_fix(
            FixTemplate::new(
                FixAction::Replace {
                    with: "origins=ALLOWED_ORIGINS".to_string(),
                },
                SafetyClass::Simple,
            )
            .with_invariant(Invariant::MustNotMatch(r"\*".to_string())),
        )
}

fn missing_log() -> Pattern {
    Pattern::new("missing-log", "observability", Severity::Medium)
        .detect(Descriptor::regex(r#"CORS\(app, origins="\*"\)"#).with_confidence(0.8))
        .with_fix(FixTemplate::new(
            FixAction::RegexReplace {
                pattern: r"^CORS\((.*)\)$".to_string(),
                replacement: "log_cors(CORS($1))".to_string(),
            },
            SafetyClass::Simple,
        ))
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Scan `paths` with `patterns` and return every fix candidate.
fn candidates(patterns: Vec<Pattern>, paths: &[&Path]) -> Vec<FixCandidate> {
    let registry = Arc::new(RuleRegistry::from_patterns(patterns).unwrap());
    let scorer = EnsembleScorer::from_config(registry, &ScanConfig::default()).unwrap();
    let provider = TreeSitterProvider::new();
    let files: Vec<SourceFile> = paths
        .iter()
        .map(|p| {
            let mut file = SourceFile::read(p).unwrap().unwrap();
            file.parse_with(&provider).unwrap();
            file
        })
        .collect();
    scorer.scan(&files).fix_candidates()
}

fn orchestrator(trail: Arc<InMemoryAuditTrail>) -> FixOrchestrator {
    FixOrchestrator::new(trail).with_syntax_provider(Arc::new(TreeSitterProvider::new()))
}

fn key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// CRITICAL cors fix wins over the overlapping MEDIUM logging fix.
#[test]
fn test_higher_severity_wins_conflict() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors(), missing_log()], &[&path]);
    assert_eq!(found.len(), 2);

    let trail = Arc::new(InMemoryAuditTrail::new());
    let report = orchestrator(trail.clone())
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();

    let cors = report
        .decisions()
        .find(|d| d.rule == "no-wildcard-cors")
        .unwrap();
    let log = report.decisions().find(|d| d.rule == "missing-log").unwrap();
    assert_eq!(cors.state, FixState::Confirmed);
    assert_eq!(log.state, FixState::Rejected);
    assert_eq!(
        log.reason,
        Some(RejectReason::ConflictRejected {
            against: cors.candidate_id.clone(),
            resolution: ConflictResolution::HigherSeverity,
        })
    );
    assert!(!report.all_succeeded(), "the displaced logging fix did not succeed");

    assert_eq!(
        read(&path),
        "app = Flask(__name__)\nCORS(app, origins=ALLOWED_ORIGINS)\n"
    );
    let backup = orchestrator(trail.clone()).backup_path(&key(&path));
    assert!(!backup.exists(), "backup removed after a clean file");

    let history = trail.replay(&DecisionId::new(cors.decision_id.clone())).unwrap();
    let states: Vec<FixState> = history.iter().map(|e| e.to).collect();
    assert_eq!(
        states,
        vec![
            FixState::Proposed,
            FixState::Validated,
            FixState::Applied,
            FixState::Confirmed
        ]
    );
    assert_eq!(replay_state(&history).unwrap(), Some(FixState::Confirmed));
    let applied = &history[2];
    assert_eq!(applied.before_hash, Some(ContentHash::of_str(CORS_APP)));
    assert_eq!(applied.after_hash, Some(ContentHash::of_str(&read(&path))));

    let log_history = trail.replay(&DecisionId::new(log.decision_id.clone())).unwrap();
    assert_eq!(log_history.len(), 2, "displaced candidate never reaches Validated");
}

/// A complex fix under a simple-only policy is excluded and never applied.
#[test]
fn test_complex_fix_policy_excluded() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let complex = Pattern::new("no-wildcard-cors", "security", Severity::Critical)
        .detect(Descriptor::regex(r#"origins="\*""#))
        .with_fix(FixTemplate::new(
            FixAction::Replace {
                with: "origins=load_origins()".to_string(),
            },
            SafetyClass::Complex,
        ));
    let found = candidates(vec![complex], &[&path]);

    let trail = Arc::new(InMemoryAuditTrail::new());
    let report = orchestrator(trail.clone())
        .run(found, &FixPolicy::new(SafetyClass::Simple), &CancellationToken::new())
        .unwrap();

    let decision = report.decisions().next().unwrap();
    assert_eq!(decision.state, FixState::Rejected);
    assert_eq!(
        decision.reason,
        Some(RejectReason::PolicyExcluded(PolicyClause::SafetyClass {
            class: SafetyClass::Complex,
            max: SafetyClass::Simple,
        }))
    );
    assert_eq!(read(&path), CORS_APP);
    assert!(trail
        .entries()
        .unwrap()
        .iter()
        .all(|e| e.to != FixState::Applied));
}

/// Files matching an exclusion glob are left alone.
#[test]
fn test_excluded_glob_not_applied() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "generated/app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&path]);

    let policy = FixPolicy::default().excluding(glob::Pattern::new("*/generated/*").unwrap());
    let report = orchestrator(Arc::new(InMemoryAuditTrail::new()))
        .run(found, &policy, &CancellationToken::new())
        .unwrap();

    let decision = report.decisions().next().unwrap();
    assert!(matches!(
        decision.reason,
        Some(RejectReason::PolicyExcluded(PolicyClause::ExcludedPath { .. }))
    ));
    assert_eq!(read(&path), CORS_APP);
}

/// A fix that breaks the parse is rolled back to the exact pre-fix bytes.
#[test]
fn test_syntax_breaking_fix_rolled_back() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let breaking = Pattern::new("no-wildcard-cors", "security", Severity::Critical)
        .detect(Descriptor::regex(r#"origins="\*""#))
        .with_fix(FixTemplate::new(
            FixAction::Replace {
                with: "origins=(".to_string(),
            },
            SafetyClass::Simple,
        ));
    let found = candidates(vec![breaking], &[&path]);

    let trail = Arc::new(InMemoryAuditTrail::new());
    let report = orchestrator(trail.clone())
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.rolled_back(), 1);
    assert!(!report.all_succeeded());
    assert_eq!(read(&path), CORS_APP);

    let rolled = trail
        .entries()
        .unwrap()
        .into_iter()
        .find(|e| e.to == FixState::RolledBack)
        .unwrap();
    assert_eq!(rolled.after_hash, Some(ContentHash::of_str(CORS_APP)));
    assert!(rolled.reason.unwrap().contains("syntax"));
    assert!(!orchestrator(trail).backup_path(&key(&path)).exists());
}

/// A violated invariant rolls back even without a syntax provider.
#[test]
fn test_invariant_failure_rolled_back() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let sloppy = Pattern::new("no-wildcard-cors", "security", Severity::Critical)
        .detect(Descriptor::regex(r#"origins="\*""#))
        .with_fix(
            FixTemplate::new(
                FixAction::Replace {
                    with: "origins=\"**\"".to_string(),
                },
                SafetyClass::Simple,
            )
            .with_invariant(Invariant::MustNotMatch(r"\*".to_string())),
        );
    let found = candidates(vec![sloppy], &[&path]);

    let report = FixOrchestrator::new(Arc::new(InMemoryAuditTrail::new()))
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.rolled_back(), 1);
    assert_eq!(read(&path), CORS_APP);
}

/// Edits later in a file land at offsets shifted by earlier edits.
#[test]
fn test_sequential_edits_shift_offsets() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "app.py",
        "CORS(a, origins=\"*\")\nCORS(b, origins=\"*\")\n",
    );
    let found = candidates(vec![no_wildcard_cors()], &[&path]);
    assert_eq!(found.len(), 2);

    let report = orchestrator(Arc::new(InMemoryAuditTrail::new()))
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.confirmed(), 2);
    assert_eq!(
        read(&path),
        "CORS(a, origins=ALLOWED_ORIGINS)\nCORS(b, origins=ALLOWED_ORIGINS)\n"
    );
}

/// Dry runs validate fully but never touch the file or write a backup.
#[test]
fn test_dry_run_does_not_mutate() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors(), missing_log()], &[&path]);

    let trail = Arc::new(InMemoryAuditTrail::new());
    let orchestrator = orchestrator(trail);
    let report = orchestrator
        .run(found, &FixPolicy::default().dry_run(true), &CancellationToken::new())
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.dry_run_confirmed(), 1);
    assert_eq!(report.rejected(), 1);
    assert_eq!(read(&path), CORS_APP);
    assert!(!orchestrator.backup_path(&key(&path)).exists());
}

/// Content changed after the scan makes every candidate stale.
#[test]
fn test_changed_file_is_stale() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&path]);
    std::fs::write(&path, "app = Flask(__name__)\nCORS(app, origins=\"https://x\")\n").unwrap();

    let report = orchestrator(Arc::new(InMemoryAuditTrail::new()))
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    let decision = report.decisions().next().unwrap();
    assert_eq!(decision.state, FixState::Rejected);
    assert_eq!(decision.reason, Some(RejectReason::StaleContext));
}

/// Cancelling before the batch starts skips every file.
#[test]
fn test_cancelled_batch_skips_files() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", CORS_APP);
    let b = write(&dir, "b.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&a, &b]);

    let token = CancellationToken::new();
    token.cancel();
    let report = orchestrator(Arc::new(InMemoryAuditTrail::new()))
        .run(found, &FixPolicy::default(), &token)
        .unwrap();

    assert_eq!(report.files.len(), 2);
    assert!(report.files.iter().all(|f| f.outcome == FileOutcome::Skipped));
    assert!(report
        .decisions()
        .all(|d| d.reason == Some(RejectReason::Cancelled)));
    assert_eq!(read(&a), CORS_APP);
    assert_eq!(read(&b), CORS_APP);
}

/// A configured batch deadline that has already elapsed skips every file.
#[test]
fn test_config_deadline_skips_unstarted_files() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.py", CORS_APP);
    let b = write(&dir, "b.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&a, &b]);

    let config = FixConfig {
        timeout_secs: Some(0),
        ..FixConfig::default()
    };
    assert!(config.cancellation_token().is_cancelled());

    let token = CancellationToken::new();
    let report = FixOrchestrator::from_config(Arc::new(InMemoryAuditTrail::new()), &config)
        .run(found, &config.policy().unwrap(), &token)
        .unwrap();

    assert!(report.files.iter().all(|f| f.outcome == FileOutcome::Skipped));
    assert!(report
        .decisions()
        .all(|d| d.reason == Some(RejectReason::Cancelled)));
    assert!(token.is_cancelled(), "deadline trips the caller's token");
    assert_eq!(read(&a), CORS_APP);
    assert_eq!(read(&b), CORS_APP);
}

/// A backup left by an interrupted batch blocks the file and is never
/// overwritten or removed by a new batch.
#[test]
fn test_leftover_backup_blocks_batch() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&path]);

    let trail = Arc::new(InMemoryAuditTrail::new());
    let orchestrator = orchestrator(trail);
    let backup = orchestrator.backup_path(&key(&path));
    std::fs::write(&backup, "ORIGINAL PRE-BATCH CONTENT\n").unwrap();

    let report = orchestrator
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();

    let decision = report.decisions().next().unwrap();
    assert_eq!(decision.state, FixState::Rejected);
    assert!(matches!(decision.reason, Some(RejectReason::NeedsRecovery { .. })));
    assert!(matches!(report.files[0].outcome, FileOutcome::Aborted { .. }));
    assert!(!report.all_succeeded());
    assert_eq!(read(&path), CORS_APP);
    assert_eq!(read(&backup), "ORIGINAL PRE-BATCH CONTENT\n");
}

/// Unfinished decisions from an earlier batch block the file until
/// `recover` closes them.
#[test]
fn test_unfinished_decisions_block_until_recovered() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let file = key(&path);

    let trail = Arc::new(InMemoryAuditTrail::new());
    trail
        .record(&AuditEntry::transition(
            DecisionId::new("batch-old:c9"),
            "c9",
            "batch-old",
            &file,
            "no-wildcard-cors",
            None,
            FixState::Proposed,
        ))
        .unwrap();
    let orchestrator = orchestrator(trail.clone());

    let found = candidates(vec![no_wildcard_cors()], &[&path]);
    let blocked = orchestrator
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    let decision = blocked.decisions().next().unwrap();
    assert!(matches!(decision.reason, Some(RejectReason::NeedsRecovery { .. })));
    assert_eq!(read(&path), CORS_APP);

    let recovery = orchestrator.recover(&file).unwrap();
    assert_eq!(recovery.interrupted, 1);
    assert!(trail.find_active_by_file(&file).unwrap().is_empty());

    let found = candidates(vec![no_wildcard_cors()], &[&path]);
    let report = orchestrator
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.confirmed(), 1);
    assert!(report.all_succeeded());
}

/// Trail that starts failing after a fixed number of writes.
struct FailingAuditTrail {
    inner: Arc<InMemoryAuditTrail>,
    allowed: usize,
    writes: AtomicUsize,
}

impl AuditTrail for FailingAuditTrail {
    fn record(&self, entry: &AuditEntry) -> Result<u64, AuditError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(AuditError::WriteFailed {
                decision_id: entry.decision_id.to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.record(entry)
    }

    fn replay(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.replay(decision_id)
    }

    fn find_active_by_file(&self, file: &str) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.find_active_by_file(file)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.entries()
    }
}

/// An audit failure halts the batch; the leftover backup then drives recovery.
#[test]
fn test_audit_failure_halts_and_recovers() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors(), missing_log()], &[&path]);

    // Proposed x2, Rejected, Validated succeed; the Applied record fails.
    let inner = Arc::new(InMemoryAuditTrail::new());
    let failing = Arc::new(FailingAuditTrail {
        inner: inner.clone(),
        allowed: 4,
        writes: AtomicUsize::new(0),
    });
    let err = FixOrchestrator::new(failing)
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, FixError::AuditWrite(_)));
    assert!(err.is_fatal());
    assert_eq!(inner.len(), 4);

    let file = key(&path);
    let recovering = FixOrchestrator::new(inner.clone());
    assert!(recovering.backup_path(&file).exists(), "crash signal left behind");
    assert_ne!(read(&path), CORS_APP);

    let recovery = recovering.recover(&file).unwrap();
    assert!(recovery.backup_found);
    assert!(recovery.restored);
    assert_eq!(recovery.interrupted, 1);
    assert_eq!(read(&path), CORS_APP);
    assert!(!recovering.backup_path(&file).exists());
    assert!(inner.find_active_by_file(&file).unwrap().is_empty());
}

#[derive(Default)]
struct TransitionCounter {
    transitions: AtomicUsize,
    batches: AtomicUsize,
}

impl WardenEventHandler for TransitionCounter {
    fn on_fix_transition(&self, _event: &FixTransitionEvent) {
        self.transitions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, _event: &BatchCompleteEvent) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }
}

/// Every recorded transition is also emitted as an event.
#[test]
fn test_transitions_emit_events() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.py", CORS_APP);
    let found = candidates(vec![no_wildcard_cors()], &[&path]);

    let counter = Arc::new(TransitionCounter::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(counter.clone());
    let trail = Arc::new(InMemoryAuditTrail::new());
    let report = orchestrator(trail.clone())
        .with_dispatcher(dispatcher)
        .run(found, &FixPolicy::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.confirmed(), 1);
    assert_eq!(counter.transitions.load(Ordering::SeqCst), trail.len());
    assert_eq!(counter.batches.load(Ordering::SeqCst), 1);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"confirmed\""));
}
