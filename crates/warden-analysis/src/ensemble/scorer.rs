//! Ensemble scorer: runs strategies per file, merges and scores findings.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use warden_core::config::ScanConfig;
use warden_core::errors::DetectionError;
use warden_core::events::{
    EventDispatcher, ScanCompleteEvent, ScanStartedEvent, StrategyFailedEvent,
    ViolationDetectedEvent,
};
use warden_core::traits::{Cancellable, CancellationToken};

use super::merge::merge_findings;
use super::stats::StrategyStatsTable;
use super::types::{RawFinding, ScanReport, ScanStats, StrategyFailure, Violation};
use crate::detectors::{builtin_strategies, DetectorStrategy};
use crate::fixes::FixCandidate;
use crate::rules::RuleRegistry;
use crate::source::SourceFile;
use crate::suppression::SuppressionChecker;

/// Output of scanning a single file.
#[derive(Debug, Default)]
struct FileScan {
    violations: Vec<Violation>,
    failures: Vec<StrategyFailure>,
    findings: usize,
    suppressed: usize,
    below_threshold: usize,
    skipped: bool,
}

/// Runs every applicable strategy over each file and combines their
/// findings into scored violations.
pub struct EnsembleScorer {
    registry: Arc<RuleRegistry>,
    strategies: Vec<Arc<dyn DetectorStrategy>>,
    stats: Arc<StrategyStatsTable>,
    dispatcher: EventDispatcher,
    suppression: SuppressionChecker,
    min_confidence: f64,
    respect_suppressions: bool,
    max_file_size: u64,
    threads: Option<usize>,
}

impl EnsembleScorer {
    pub fn new(
        registry: Arc<RuleRegistry>,
        strategies: Vec<Arc<dyn DetectorStrategy>>,
        stats: Arc<StrategyStatsTable>,
    ) -> Self {
        let defaults = ScanConfig::default();
        Self {
            registry,
            strategies,
            stats,
            dispatcher: EventDispatcher::new(),
            suppression: SuppressionChecker::new(),
            min_confidence: defaults.effective_min_confidence(),
            respect_suppressions: defaults.effective_respect_suppressions(),
            max_file_size: defaults.effective_max_file_size(),
            threads: None,
        }
    }

    /// Build a scorer with the built-in strategies and a fresh statistics
    /// table sized to them.
    pub fn from_config(
        registry: Arc<RuleRegistry>,
        config: &ScanConfig,
    ) -> Result<Self, DetectionError> {
        let strategies = builtin_strategies(&registry)?;
        let stats = Arc::new(StrategyStatsTable::from_config(
            strategies.iter().map(|s| s.id().to_string()),
            config,
        ));
        Ok(Self::new(registry, strategies, stats).with_config(config))
    }

    pub fn with_config(mut self, config: &ScanConfig) -> Self {
        self.min_confidence = config.effective_min_confidence();
        self.respect_suppressions = config.effective_respect_suppressions();
        self.max_file_size = config.effective_max_file_size();
        self.threads = config.threads;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn stats(&self) -> &Arc<StrategyStatsTable> {
        &self.stats
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn scan(&self, files: &[SourceFile]) -> ScanReport {
        self.scan_with_cancel(files, &CancellationToken::new())
    }

    /// Scan `files` in parallel. Files not yet started when `cancel` fires
    /// are counted as skipped.
    pub fn scan_with_cancel(&self, files: &[SourceFile], cancel: &CancellationToken) -> ScanReport {
        let span = tracing::info_span!("warden.scan", files = files.len());
        let _guard = span.enter();
        let start = Instant::now();

        self.dispatcher.emit_scan_started(&ScanStartedEvent {
            file_count: files.len(),
            strategy_count: self.strategies.len(),
        });

        let run = || -> Vec<FileScan> {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        return FileScan {
                            skipped: true,
                            ..FileScan::default()
                        };
                    }
                    self.scan_file(file)
                })
                .collect()
        };

        let per_file = match self.threads.map(|n| {
            rayon::ThreadPoolBuilder::new().num_threads(n).build()
        }) {
            Some(Ok(pool)) => pool.install(run),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "could not build scan thread pool, using global pool");
                run()
            }
            None => run(),
        };

        let mut report = ScanReport::default();
        for scan in per_file {
            if scan.skipped {
                report.stats.files_skipped += 1;
                continue;
            }
            report.stats.files_scanned += 1;
            report.stats.findings += scan.findings;
            report.stats.suppressed += scan.suppressed;
            report.stats.below_threshold += scan.below_threshold;
            report.violations.extend(scan.violations);
            report.failures.extend(scan.failures);
        }

        report.violations.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.span.start.cmp(&b.span.start))
                .then_with(|| a.rule.cmp(&b.rule))
                .then_with(|| a.span.end.cmp(&b.span.end))
        });
        report.failures.sort_by(|a, b| {
            a.file.cmp(&b.file).then_with(|| a.strategy.cmp(&b.strategy))
        });
        report.stats.violations = report.violations.len();
        report.stats.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            files_scanned = report.stats.files_scanned,
            files_skipped = report.stats.files_skipped,
            violation_count = report.stats.violations,
            strategy_failures = report.failures.len(),
            "scan complete"
        );
        self.dispatcher.emit_scan_complete(&ScanCompleteEvent {
            files_scanned: report.stats.files_scanned,
            files_skipped: report.stats.files_skipped,
            violations: report.stats.violations,
            failures: report.failures.len(),
            duration_ms: report.stats.duration_ms,
        });
        report
    }

    fn scan_file(&self, file: &SourceFile) -> FileScan {
        let mut out = FileScan::default();
        if file.content.len() as u64 > self.max_file_size {
            tracing::debug!(file = %file.path, bytes = file.content.len(), "file too large, skipped");
            out.skipped = true;
            return out;
        }

        let mut findings: Vec<RawFinding> = Vec::new();
        for strategy in self.strategies.iter().filter(|s| s.supports(file.language)) {
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| strategy.scan(file)));
            let elapsed = started.elapsed();
            tracing::trace!(
                strategy = strategy.id(),
                file = %file.path,
                strategy_time_us = elapsed.as_micros() as u64,
                "strategy finished"
            );

            let failure = match result {
                Ok(Ok(found)) => {
                    let found: Vec<RawFinding> = found
                        .into_iter()
                        .filter(|f| self.accept_finding(f, file))
                        .collect();
                    self.stats.record_run(strategy.id(), found.len(), false, elapsed);
                    findings.extend(found);
                    None
                }
                Ok(Err(e)) => Some((e.to_string(), false)),
                Err(payload) => Some((panic_message(payload.as_ref()), true)),
            };

            if let Some((message, panicked)) = failure {
                self.stats.record_run(strategy.id(), 0, true, elapsed);
                tracing::warn!(
                    strategy = strategy.id(),
                    file = %file.path,
                    panicked,
                    %message,
                    "strategy failed; findings discarded for this file"
                );
                self.dispatcher.emit_strategy_failed(&StrategyFailedEvent {
                    strategy: strategy.id().to_string(),
                    file: file.path.clone(),
                    message: message.clone(),
                });
                out.failures.push(StrategyFailure {
                    strategy: strategy.id().to_string(),
                    file: file.path.clone(),
                    message,
                    panicked,
                });
            }
        }
        out.findings = findings.len();

        let lines: Vec<&str> = file.content.lines().collect();
        for group in merge_findings(findings, |s| self.stats.weight(s)) {
            let Some(pattern) = self.registry.get(&group.rule) else {
                continue;
            };
            if group.confidence < self.min_confidence {
                out.below_threshold += 1;
                continue;
            }

            let suppressed = self.respect_suppressions
                && self.suppression.is_suppressed(&lines, group.line, &group.rule);
            if suppressed {
                out.suppressed += 1;
            }

            let mut violation = Violation {
                id: Violation::make_id(&group.rule, &group.file, group.span),
                file: group.file,
                span: group.span,
                line: group.line,
                rule: group.rule,
                category: pattern.category.clone(),
                severity: pattern.severity,
                confidence: group.confidence,
                strategies: group.strategies,
                suppressed,
                fix: None,
            };
            violation.fix = FixCandidate::from_violation(&violation, pattern, &file.content);

            self.dispatcher.emit_violation_detected(&ViolationDetectedEvent {
                violation_id: violation.id.clone(),
                file: violation.file.clone(),
                rule: violation.rule.clone(),
                severity: violation.severity,
                confidence: violation.confidence,
            });
            out.violations.push(violation);
        }
        out
    }

    /// Drop findings for unknown rules, other files, or spans outside the
    /// content; clamp confidences.
    fn accept_finding(&self, finding: &RawFinding, file: &SourceFile) -> bool {
        let ok = finding.file == file.path
            && self.registry.get(&finding.rule).is_some()
            && finding.span.start <= finding.span.end
            && finding.span.slice(&file.content).is_some();
        if !ok {
            tracing::debug!(
                rule = %finding.rule,
                strategy = %finding.strategy,
                file = %file.path,
                "finding discarded"
            );
        }
        ok
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "strategy panicked".to_string()
    }
}

impl std::fmt::Debug for EnsembleScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleScorer")
            .field("rules", &self.registry.len())
            .field("strategies", &self.strategy_ids())
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}
