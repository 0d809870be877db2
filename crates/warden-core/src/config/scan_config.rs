//! Scan configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the ensemble scan.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Worker threads. Default: rayon's global pool.
    pub threads: Option<usize>,
    /// Violations below this combined confidence are dropped. Default: 0.0.
    pub min_confidence: Option<f64>,
    /// Files larger than this many bytes are skipped. Default: 1 MiB.
    pub max_file_size: Option<u64>,
    /// Honor `warden-ignore` / `noqa` comments. Default: true.
    pub respect_suppressions: Option<bool>,
    /// Decay applied to historic feedback counts before reweighting. Default: 0.9.
    pub feedback_decay: Option<f64>,
    /// Lower bound for an adaptive strategy weight. Default: 0.05.
    pub min_strategy_weight: Option<f64>,
}

impl ScanConfig {
    pub fn effective_min_confidence(&self) -> f64 {
        self.min_confidence.unwrap_or(0.0)
    }

    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(1_048_576)
    }

    pub fn effective_respect_suppressions(&self) -> bool {
        self.respect_suppressions.unwrap_or(true)
    }

    pub fn effective_feedback_decay(&self) -> f64 {
        self.feedback_decay.unwrap_or(0.9)
    }

    pub fn effective_min_strategy_weight(&self) -> f64 {
        self.min_strategy_weight.unwrap_or(0.05)
    }
}
