//! Per-strategy running statistics and adaptive weights.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use statrs::distribution::Beta;
use statrs::statistics::Distribution;

use warden_core::config::ScanConfig;

use super::noisy_or::clamp_unit;

/// Running statistics for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub files_scanned: u64,
    pub findings: u64,
    pub failures: u64,
    pub elapsed_us: u64,
    /// Decayed confirmed-hit count from feedback.
    pub hits: f64,
    /// Decayed false-positive count from feedback.
    pub false_positives: f64,
    /// Weight used in noisy-OR. Starts at 1.0.
    pub weight: f64,
}

impl Default for StrategyStats {
    fn default() -> Self {
        Self {
            files_scanned: 0,
            findings: 0,
            failures: 0,
            elapsed_us: 0,
            hits: 0.0,
            false_positives: 0.0,
            weight: 1.0,
        }
    }
}

/// Thread-safe statistics table.
///
/// The set of strategies is fixed at construction; each entry has its own
/// lock so scanning threads only contend on the same strategy.
#[derive(Debug)]
pub struct StrategyStatsTable {
    entries: FxHashMap<String, Mutex<StrategyStats>>,
    decay: f64,
    min_weight: f64,
}

impl StrategyStatsTable {
    pub fn new<I, S>(strategy_ids: I, decay: f64, min_weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: strategy_ids
                .into_iter()
                .map(|id| (id.into(), Mutex::new(StrategyStats::default())))
                .collect(),
            decay: clamp_unit(decay),
            min_weight: clamp_unit(min_weight),
        }
    }

    pub fn from_config<I, S>(strategy_ids: I, config: &ScanConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            strategy_ids,
            config.effective_feedback_decay(),
            config.effective_min_strategy_weight(),
        )
    }

    fn lock(&self, strategy: &str) -> Option<MutexGuard<'_, StrategyStats>> {
        self.entries
            .get(strategy)
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn contains(&self, strategy: &str) -> bool {
        self.entries.contains_key(strategy)
    }

    /// Current weight; strategies outside the table weigh 1.0.
    pub fn weight(&self, strategy: &str) -> f64 {
        self.lock(strategy).map_or(1.0, |s| s.weight)
    }

    /// Record one file's run of `strategy`.
    pub fn record_run(&self, strategy: &str, findings: usize, failed: bool, elapsed: Duration) {
        if let Some(mut stats) = self.lock(strategy) {
            stats.files_scanned += 1;
            stats.findings += findings as u64;
            if failed {
                stats.failures += 1;
            }
            stats.elapsed_us += elapsed.as_micros() as u64;
        }
    }

    /// Fold in reviewer feedback and recompute the weight.
    ///
    /// Historic counts are multiplied by the decay factor first; the new
    /// weight is the mean of Beta(1 + hits, 1 + false_positives), clamped
    /// to `[min_weight, 1]`. Returns `None` for unknown strategies.
    pub fn apply_feedback(&self, strategy: &str, hits: u64, false_positives: u64) -> Option<f64> {
        let mut stats = self.lock(strategy)?;
        stats.hits = stats.hits * self.decay + hits as f64;
        stats.false_positives = stats.false_positives * self.decay + false_positives as f64;
        stats.weight = posterior_mean(1.0 + stats.hits, 1.0 + stats.false_positives)
            .clamp(self.min_weight, 1.0);
        tracing::debug!(
            strategy,
            hits,
            false_positives,
            weight = stats.weight,
            "strategy weight updated"
        );
        Some(stats.weight)
    }

    pub fn snapshot(&self, strategy: &str) -> Option<StrategyStats> {
        self.lock(strategy).map(|s| s.clone())
    }

    /// All entries sorted by strategy id.
    pub fn snapshots(&self) -> Vec<(String, StrategyStats)> {
        let mut out: Vec<_> = self
            .entries
            .keys()
            .filter_map(|id| self.snapshot(id).map(|s| (id.clone(), s)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Replace a strategy's entry, e.g. from persisted statistics.
    /// Unknown strategies are ignored.
    pub fn restore(&self, strategy: &str, stats: StrategyStats) -> bool {
        match self.lock(strategy) {
            Some(mut current) => {
                *current = stats;
                current.weight = clamp_unit(current.weight).max(self.min_weight);
                true
            }
            None => false,
        }
    }
}

fn posterior_mean(alpha: f64, beta: f64) -> f64 {
    Beta::new(alpha, beta)
        .ok()
        .and_then(|d| d.mean())
        .unwrap_or_else(|| alpha / (alpha + beta))
}
