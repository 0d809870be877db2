//! Fix batch configuration and the policy object handed to the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::traits::CancellationToken;
use crate::types::SafetyClass;

/// Configuration for automated fixing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FixConfig {
    /// Highest safety class a batch may apply. Default: simple.
    pub max_safety_class: Option<SafetyClass>,
    /// Validate and record without writing. Default: false.
    pub dry_run: Option<bool>,
    /// Candidates from violations below this confidence are excluded. Default: 0.5.
    pub min_confidence: Option<f64>,
    /// Glob patterns of files never fixed automatically.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Suffix appended to a file's name for its pre-batch backup. Default: ".warden-bak".
    pub backup_suffix: Option<String>,
    /// Batch deadline in seconds; treated as cancellation once exceeded.
    pub timeout_secs: Option<u64>,
}

impl FixConfig {
    pub fn effective_max_safety_class(&self) -> SafetyClass {
        self.max_safety_class.unwrap_or(SafetyClass::Simple)
    }

    pub fn effective_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(false)
    }

    pub fn effective_min_confidence(&self) -> f64 {
        self.min_confidence.unwrap_or(0.5)
    }

    pub fn effective_backup_suffix(&self) -> &str {
        self.backup_suffix.as_deref().unwrap_or(".warden-bak")
    }

    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Token for one batch: carries the configured deadline, if any.
    pub fn cancellation_token(&self) -> CancellationToken {
        match self.effective_timeout() {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        }
    }

    /// Build the policy object for a fix batch.
    pub fn policy(&self) -> Result<FixPolicy, ConfigError> {
        let mut exclude = Vec::with_capacity(self.exclude.len());
        for raw in &self.exclude {
            let pattern = glob::Pattern::new(raw).map_err(|e| ConfigError::ValidationFailed {
                field: "fix.exclude".to_string(),
                message: format!("invalid glob '{raw}': {e}"),
            })?;
            exclude.push(pattern);
        }
        Ok(FixPolicy {
            max_safety_class: self.effective_max_safety_class(),
            dry_run: self.effective_dry_run(),
            min_confidence: self.effective_min_confidence(),
            exclude,
        })
    }
}

/// Control surface of a fix batch.
#[derive(Debug, Clone)]
pub struct FixPolicy {
    pub max_safety_class: SafetyClass,
    pub dry_run: bool,
    pub min_confidence: f64,
    pub exclude: Vec<glob::Pattern>,
}

impl FixPolicy {
    pub fn new(max_safety_class: SafetyClass) -> Self {
        Self {
            max_safety_class,
            dry_run: false,
            min_confidence: 0.0,
            exclude: Vec::new(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn excluding(mut self, pattern: glob::Pattern) -> Self {
        self.exclude.push(pattern);
        self
    }

    /// True when `file` matches one of the exclusion globs.
    pub fn excludes_file(&self, file: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(file))
    }
}

impl Default for FixPolicy {
    fn default() -> Self {
        Self::new(SafetyClass::Simple)
    }
}
