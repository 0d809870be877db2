//! Fix orchestrator: drives candidates through validation, application,
//! verification and the audit trail.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;

use warden_core::audit::{now_ms, Actor, AuditEntry, AuditTrail, DecisionId, FixState};
use warden_core::config::{FixConfig, FixPolicy};
use warden_core::errors::{AuditError, FixError};
use warden_core::events::{BatchCompleteEvent, EventDispatcher, FixTransitionEvent};
use warden_core::traits::{Cancellable, CancellationToken};
use warden_core::types::{ContentHash, Span};

use super::arena::EditArena;
use super::context::{FixContextAnalyzer, RejectReason, Validation, ValidationSet};
use super::decision::FixDecision;
use super::report::{BatchReport, FileOutcome, FileReport, RecoveryReport};
use super::transaction::{backup_path_for, ApplyOutcome, FileTransaction};
use super::verifier::FixVerifier;
use super::FixCandidate;
use crate::source::Language;
use crate::syntax::SyntaxTreeProvider;

static BATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

fn new_batch_id() -> String {
    format!(
        "batch-{}-{:04}",
        now_ms(),
        BATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Shared state of one running batch.
struct BatchContext<'a> {
    batch_id: &'a str,
    policy: &'a FixPolicy,
    cancel: &'a CancellationToken,
    halted: AtomicBool,
}

/// Applies fix candidates file by file with full auditability.
pub struct FixOrchestrator {
    trail: Arc<dyn AuditTrail>,
    analyzer: FixContextAnalyzer,
    verifier: FixVerifier,
    dispatcher: EventDispatcher,
    backup_suffix: String,
    actor: Actor,
    timeout: Option<Duration>,
}

impl FixOrchestrator {
    pub fn new(trail: Arc<dyn AuditTrail>) -> Self {
        Self {
            trail,
            analyzer: FixContextAnalyzer::new(),
            verifier: FixVerifier::new(),
            dispatcher: EventDispatcher::new(),
            backup_suffix: FixConfig::default().effective_backup_suffix().to_string(),
            actor: Actor::Automated,
            timeout: None,
        }
    }

    pub fn from_config(trail: Arc<dyn AuditTrail>, config: &FixConfig) -> Self {
        let orchestrator = Self::new(trail).with_backup_suffix(config.effective_backup_suffix());
        match config.effective_timeout() {
            Some(timeout) => orchestrator.with_timeout(timeout),
            None => orchestrator,
        }
    }

    pub fn with_syntax_provider(mut self, provider: Arc<dyn SyntaxTreeProvider>) -> Self {
        self.verifier = FixVerifier::with_provider(provider);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Bound every batch by `timeout`; files not started when it elapses
    /// are skipped as cancelled.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn backup_path(&self, file: &str) -> PathBuf {
        backup_path_for(Path::new(file), &self.backup_suffix)
    }

    /// Run one batch.
    ///
    /// Files are processed in parallel, each one sequentially by ascending
    /// span start. Returns `Err` only when the audit trail fails (the batch
    /// halts) or a decision would make an illegal transition.
    pub fn run(
        &self,
        candidates: Vec<FixCandidate>,
        policy: &FixPolicy,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, FixError> {
        let batch_id = new_batch_id();
        let span = tracing::info_span!(
            "warden.fix_batch",
            batch_id = %batch_id,
            candidate_count = candidates.len(),
            dry_run = policy.dry_run
        );
        let _guard = span.enter();

        let mut by_file: BTreeMap<String, Vec<FixCandidate>> = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for candidate in candidates {
            if !seen.insert(candidate.id.clone()) {
                tracing::warn!(candidate = %candidate.id, "duplicate candidate id ignored");
                continue;
            }
            by_file.entry(candidate.file.clone()).or_default().push(candidate);
        }
        let work: Vec<(String, Vec<FixCandidate>)> = by_file
            .into_iter()
            .map(|(file, mut list)| {
                list.sort_by(|a, b| {
                    a.span
                        .start
                        .cmp(&b.span.start)
                        .then_with(|| a.span.end.cmp(&b.span.end))
                        .then_with(|| a.id.cmp(&b.id))
                });
                (file, list)
            })
            .collect();

        let bounded;
        let cancel = match self.timeout {
            Some(timeout) => {
                bounded = cancel.bounded(timeout);
                &bounded
            }
            None => cancel,
        };

        let ctx = BatchContext {
            batch_id: &batch_id,
            policy,
            cancel,
            halted: AtomicBool::new(false),
        };

        let results: Vec<Result<FileReport, FixError>> = work
            .into_par_iter()
            .map(|(file, list)| self.process_file(&ctx, file, list))
            .collect();

        let mut files = Vec::with_capacity(results.len());
        let mut first_error: Option<FixError> = None;
        for result in results {
            match result {
                Ok(report) => files.push(report),
                Err(e) => {
                    let replace = match &first_error {
                        None => true,
                        Some(existing) => !existing.is_fatal() && e.is_fatal(),
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            tracing::error!(batch_id = %batch_id, error = %e, "fix batch halted");
            return Err(e);
        }

        let report = BatchReport {
            batch_id: batch_id.clone(),
            dry_run: policy.dry_run,
            files,
        };
        tracing::info!(
            batch_id = %batch_id,
            files = report.files.len(),
            confirmed = report.confirmed(),
            rejected = report.rejected(),
            rolled_back = report.rolled_back(),
            dry_run = report.dry_run_confirmed(),
            "fix batch complete"
        );
        self.dispatcher.emit_batch_complete(&BatchCompleteEvent {
            batch_id,
            files: report.files.len(),
            confirmed: report.confirmed(),
            rejected: report.rejected(),
            rolled_back: report.rolled_back(),
            dry_run: report.dry_run,
        });
        Ok(report)
    }

    /// Record a transition durably, then move the decision's state.
    fn record(
        &self,
        ctx: &BatchContext<'_>,
        decision: &mut FixDecision,
        to: FixState,
        reason: Option<String>,
        before: Option<ContentHash>,
        after: Option<ContentHash>,
    ) -> Result<(), FixError> {
        if ctx.halted.load(Ordering::Acquire) {
            return Err(FixError::AuditWrite(AuditError::WriteFailed {
                decision_id: decision.id.to_string(),
                message: "batch halted after an earlier audit failure".to_string(),
            }));
        }

        let mut entry = decision
            .prepare(to)?
            .with_actor(self.actor)
            .with_hashes(before, after);
        if let Some(reason) = reason {
            entry = entry.with_reason(reason);
        }

        if let Err(e) = self.trail.record(&entry) {
            ctx.halted.store(true, Ordering::Release);
            tracing::error!(decision = %decision.id, error = %e, "audit write failed");
            return Err(e.into());
        }

        let from = decision.state();
        decision.commit(to);
        self.dispatcher.emit_fix_transition(&FixTransitionEvent {
            decision_id: decision.id.to_string(),
            file: decision.candidate.file.clone(),
            rule: decision.candidate.rule.clone(),
            from,
            to,
        });
        Ok(())
    }

    fn reject(
        &self,
        ctx: &BatchContext<'_>,
        decision: &mut FixDecision,
        reason: RejectReason,
    ) -> Result<(), FixError> {
        let text = reason.to_string();
        decision.reason = Some(reason);
        self.record(ctx, decision, FixState::Rejected, Some(text), None, None)
    }

    fn process_file(
        &self,
        ctx: &BatchContext<'_>,
        file: String,
        candidates: Vec<FixCandidate>,
    ) -> Result<FileReport, FixError> {
        let span = tracing::debug_span!("warden.fix_file", file = %file);
        let _guard = span.enter();

        let mut decisions: Vec<FixDecision> = candidates
            .into_iter()
            .map(|c| FixDecision::new(ctx.batch_id, c))
            .collect();
        for decision in &mut decisions {
            self.record(ctx, decision, FixState::Proposed, None, None, None)?;
        }

        if ctx.cancel.is_cancelled() {
            for decision in &mut decisions {
                self.reject(ctx, decision, RejectReason::Cancelled)?;
            }
            return Ok(FileReport::new(file, FileOutcome::Skipped, &decisions));
        }

        if let Some(cause) = self.pending_recovery(ctx, &file)? {
            tracing::warn!(cause = %cause, "file needs recovery; candidates rejected");
            for decision in &mut decisions {
                self.reject(ctx, decision, RejectReason::NeedsRecovery { cause: cause.clone() })?;
            }
            return Ok(FileReport::new(file, FileOutcome::Aborted { cause }, &decisions));
        }

        let path = PathBuf::from(&file);
        let tx = FileTransaction::begin(&path, &self.backup_suffix);
        let content = match tx.read() {
            Ok(content) => content,
            Err(e) => {
                let cause = e.to_string();
                tracing::warn!(error = %cause, "could not read file; candidates rejected");
                for decision in &mut decisions {
                    self.reject(ctx, decision, RejectReason::ApplyIo { message: cause.clone() })?;
                }
                return Ok(FileReport::new(file, FileOutcome::Aborted { cause }, &decisions));
            }
        };

        self.validate_all(ctx, &mut decisions, &content)?;

        if ctx.policy.dry_run {
            for decision in decisions.iter_mut() {
                if decision.state() == Some(FixState::Validated) {
                    self.record(ctx, decision, FixState::DryRunConfirmed, None, None, None)?;
                }
            }
            return Ok(FileReport::new(file, FileOutcome::Completed, &decisions));
        }

        let outcome = self.apply_all(ctx, tx, &path, &mut decisions, &content)?;
        Ok(FileReport::new(file, outcome, &decisions))
    }

    /// A leftover backup or an unfinished decision from another batch means
    /// an earlier run was interrupted on `file`; `recover` must run first.
    fn pending_recovery(&self, ctx: &BatchContext<'_>, file: &str) -> Result<Option<String>, FixError> {
        let backup = self.backup_path(file);
        if backup.exists() {
            return Ok(Some(format!("leftover backup {}", backup.display())));
        }
        let unfinished = self
            .trail
            .find_active_by_file(file)?
            .iter()
            .filter(|e| e.batch_id != ctx.batch_id)
            .count();
        Ok((unfinished > 0).then(|| format!("{unfinished} unfinished decision(s) from an earlier batch")))
    }

    /// Validate every candidate against the same snapshot, then record the
    /// final verdicts so displaced candidates never pass through `Validated`.
    fn validate_all(
        &self,
        ctx: &BatchContext<'_>,
        decisions: &mut [FixDecision],
        content: &str,
    ) -> Result<(), FixError> {
        let mut set = ValidationSet::new();
        let verdicts: Vec<Validation> = decisions
            .iter()
            .map(|d| self.analyzer.validate(&mut set, &d.candidate, content, ctx.policy))
            .collect();

        for (decision, verdict) in decisions.iter_mut().zip(verdicts) {
            let rejection = match verdict {
                Validation::Accepted => set.displacement_of(&decision.candidate.id).cloned(),
                Validation::Rejected(reason) => Some(reason),
            };
            match rejection {
                None => self.record(ctx, decision, FixState::Validated, None, None, None)?,
                Some(reason) => {
                    tracing::debug!(candidate = %decision.candidate.id, %reason, "candidate rejected");
                    self.reject(ctx, decision, reason)?;
                }
            }
        }
        Ok(())
    }

    fn apply_all(
        &self,
        ctx: &BatchContext<'_>,
        mut tx: FileTransaction,
        path: &Path,
        decisions: &mut [FixDecision],
        content: &str,
    ) -> Result<FileOutcome, FixError> {
        let language = Language::from_path(path);
        let baseline = self.verifier.baseline_errors(language, content);
        let mut arena = EditArena::new();
        let mut abort: Option<String> = None;

        for decision in decisions
            .iter_mut()
            .filter(|d| d.state() == Some(FixState::Validated))
        {
            if let Some(cause) = &abort {
                self.reject(ctx, decision, RejectReason::ApplyIo { message: cause.clone() })?;
                continue;
            }

            let candidate = decision.candidate.clone();
            let live = arena.live_span(candidate.span);
            let change = match tx.apply(&candidate.id, live, candidate.original_hash, &candidate.replacement) {
                Ok(ApplyOutcome::Applied(change)) => change,
                Ok(ApplyOutcome::Stale) => {
                    self.reject(ctx, decision, RejectReason::StaleContext)?;
                    continue;
                }
                Err(e) => {
                    let cause = e.to_string();
                    tracing::warn!(candidate = %candidate.id, error = %cause, "fix write failed; aborting file");
                    self.reject(ctx, decision, RejectReason::ApplyIo { message: cause.clone() })?;
                    abort = Some(cause);
                    continue;
                }
            };

            self.record(
                ctx,
                decision,
                FixState::Applied,
                None,
                Some(change.before),
                Some(change.after),
            )?;
            arena.push(candidate.id.clone(), candidate.span, candidate.replacement.len());

            let region = Span::new(live.start, live.start + candidate.replacement.len());
            match self
                .verifier
                .verify(path, language, baseline, &candidate, &change.content, region)
            {
                Ok(()) => {
                    self.record(
                        ctx,
                        decision,
                        FixState::Confirmed,
                        None,
                        Some(change.after),
                        Some(change.after),
                    )?;
                }
                Err(failure) => match tx.rollback(&candidate.id) {
                    Ok(restored) => {
                        arena.remove(&candidate.id);
                        self.record(
                            ctx,
                            decision,
                            FixState::RolledBack,
                            Some(failure.to_string()),
                            Some(change.after),
                            Some(restored),
                        )?;
                    }
                    Err(e) => {
                        let cause = e.to_string();
                        tracing::error!(
                            candidate = %candidate.id,
                            error = %cause,
                            "rollback failed; file left for recovery"
                        );
                        tx.mark_dirty();
                        abort = Some(cause);
                    }
                },
            }
        }

        if let Err(e) = tx.finish() {
            tracing::warn!(error = %e, "could not remove backup after completed batch");
        }
        Ok(match abort {
            Some(cause) => FileOutcome::Aborted { cause },
            None => FileOutcome::Completed,
        })
    }

    /// Repair a file left with a backup by an interrupted batch.
    ///
    /// When the trail holds unfinished decisions for `file`, the backup is
    /// restored, `Applied` decisions are recorded `RolledBack`, `Proposed`
    /// and `Validated` ones `Rejected(Interrupted)`, and any decision of the
    /// same batch that had been confirmed gets a superseding rejected
    /// decision. The backup is removed in every case. Without a backup only
    /// `Proposed` and `Validated` decisions are closed.
    pub fn recover(&self, file: &str) -> Result<RecoveryReport, FixError> {
        let path = Path::new(file);
        let backup = self.backup_path(file);
        let mut report = RecoveryReport {
            file: file.to_string(),
            ..RecoveryReport::default()
        };
        if !backup.exists() {
            // Nothing to restore: only decisions that never touched the file
            // can be closed.
            let active = self.trail.find_active_by_file(file)?;
            for last in active.iter().filter(|e| e.to != FixState::Applied) {
                self.trail.record(&self.closing_entry(file, last, FixState::Rejected))?;
                report.interrupted += 1;
            }
            let stranded = active.len() - report.interrupted;
            if stranded > 0 {
                tracing::warn!(file, stranded, "applied decisions without a backup cannot be restored");
            }
            return Ok(report);
        }
        report.backup_found = true;

        let active = self.trail.find_active_by_file(file)?;
        if active.is_empty() {
            tracing::info!(file, "backup has no unfinished decisions; removing");
            std::fs::remove_file(&backup).map_err(|e| FixError::ApplyIo { path: backup.clone(), source: e })?;
            return Ok(report);
        }

        let saved = std::fs::read_to_string(&backup)
            .map_err(|e| FixError::ApplyIo { path: backup.clone(), source: e })?;
        FileTransaction::restore(path, &saved)?;
        let restored = ContentHash::of_str(&saved);
        report.restored = true;

        let mut batches = BTreeSet::new();
        for last in &active {
            batches.insert(last.batch_id.clone());
            let to = if last.to == FixState::Applied {
                FixState::RolledBack
            } else {
                FixState::Rejected
            };
            let mut entry = self.closing_entry(file, last, to);
            if to == FixState::RolledBack {
                entry = entry.with_hashes(last.after_hash, Some(restored));
                report.rolled_back += 1;
            } else {
                report.interrupted += 1;
            }
            self.trail.record(&entry)?;
        }

        let confirmed: Vec<AuditEntry> = self
            .trail
            .entries()?
            .into_iter()
            .filter(|e| e.file == file && e.to == FixState::Confirmed && batches.contains(&e.batch_id))
            .collect();
        for old in confirmed {
            let id = DecisionId::new(format!("{}~recovery", old.decision_id));
            let proposed = AuditEntry::transition(
                id.clone(),
                old.candidate_id.clone(),
                old.batch_id.clone(),
                file,
                old.rule.clone(),
                None,
                FixState::Proposed,
            )
            .with_actor(self.actor)
            .superseding(old.decision_id.clone())
            .with_reason("confirmed fix reverted by backup restore");
            self.trail.record(&proposed)?;

            let rejected = AuditEntry::transition(
                id,
                old.candidate_id,
                old.batch_id,
                file,
                old.rule,
                Some(FixState::Proposed),
                FixState::Rejected,
            )
            .with_actor(self.actor)
            .with_reason(RejectReason::Interrupted.to_string());
            self.trail.record(&rejected)?;
            report.superseded += 1;
        }

        std::fs::remove_file(&backup).map_err(|e| FixError::ApplyIo { path: backup.clone(), source: e })?;
        tracing::info!(
            file,
            rolled_back = report.rolled_back,
            interrupted = report.interrupted,
            superseded = report.superseded,
            "file recovered from backup"
        );
        Ok(report)
    }
}

impl FixOrchestrator {
    /// Entry closing an unfinished decision found during recovery.
    fn closing_entry(&self, file: &str, last: &AuditEntry, to: FixState) -> AuditEntry {
        let reason = if to == FixState::RolledBack {
            "restored from backup after interruption".to_string()
        } else {
            RejectReason::Interrupted.to_string()
        };
        AuditEntry::transition(
            last.decision_id.clone(),
            last.candidate_id.clone(),
            last.batch_id.clone(),
            file,
            last.rule.clone(),
            Some(last.to),
            to,
        )
        .with_actor(self.actor)
        .with_reason(reason)
    }
}

impl std::fmt::Debug for FixOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixOrchestrator")
            .field("verifier", &self.verifier)
            .field("backup_suffix", &self.backup_suffix)
            .field("actor", &self.actor)
            .field("timeout", &self.timeout)
            .finish()
    }
}
