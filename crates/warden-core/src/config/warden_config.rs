//! Top-level Warden configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AuditConfig, FixConfig, ScanConfig};
use crate::errors::ConfigError;
use crate::types::SafetyClass;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`WARDEN_*`)
/// 3. Project config (`warden.toml` in project root)
/// 4. User config (`~/.warden/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    pub scan: ScanConfig,
    pub fix: FixConfig,
    pub audit: AuditConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub scan_threads: Option<usize>,
    pub scan_min_confidence: Option<f64>,
    pub fix_dry_run: Option<bool>,
    pub fix_max_safety_class: Option<SafetyClass>,
}

impl WardenConfig {
    /// Load configuration from `root` with layered resolution.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        let project_config_path = root.join("warden.toml");
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration values.
    pub fn validate(config: &WardenConfig) -> Result<(), ConfigError> {
        let unit_fields = [
            ("scan.min_confidence", config.scan.min_confidence),
            ("scan.feedback_decay", config.scan.feedback_decay),
            ("scan.min_strategy_weight", config.scan.min_strategy_weight),
            ("fix.min_confidence", config.fix.min_confidence),
        ];
        for (field, value) in unit_fields {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: "must be between 0.0 and 1.0".to_string(),
                    });
                }
            }
        }
        if config.scan.max_file_size == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "scan.max_file_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.scan.threads == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "scan.threads".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(suffix) = &config.fix.backup_suffix {
            if suffix.is_empty() || suffix.contains(['/', '\\']) {
                return Err(ConfigError::ValidationFailed {
                    field: "fix.backup_suffix".to_string(),
                    message: "must be a non-empty file name suffix".to_string(),
                });
            }
        }
        config.fix.policy()?;
        Ok(())
    }

    /// Returns the user config path: `~/.warden/config.toml`.
    fn user_config_path() -> Option<PathBuf> {
        home_dir().map(|h| h.join(".warden").join("config.toml"))
    }

    /// Merge a TOML file into the existing config. Unknown keys are ignored.
    fn merge_toml_file(config: &mut WardenConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let file_config: WardenConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it has a value.
    fn merge(base: &mut WardenConfig, other: &WardenConfig) {
        macro_rules! take {
            ($section:ident . $field:ident) => {
                if other.$section.$field.is_some() {
                    base.$section.$field = other.$section.$field.clone();
                }
            };
        }

        take!(scan.threads);
        take!(scan.min_confidence);
        take!(scan.max_file_size);
        take!(scan.respect_suppressions);
        take!(scan.feedback_decay);
        take!(scan.min_strategy_weight);

        take!(fix.max_safety_class);
        take!(fix.dry_run);
        take!(fix.min_confidence);
        take!(fix.backup_suffix);
        take!(fix.timeout_secs);
        if !other.fix.exclude.is_empty() {
            base.fix.exclude = other.fix.exclude.clone();
        }

        take!(audit.db_path);
        take!(audit.synchronous_full);
    }

    /// Apply environment variable overrides.
    /// Pattern: `WARDEN_SCAN_THREADS`, `WARDEN_FIX_DRY_RUN`, etc.
    /// Unparseable values are ignored.
    fn apply_env_overrides(config: &mut WardenConfig) {
        fn env<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = env("WARDEN_SCAN_THREADS") {
            config.scan.threads = Some(v);
        }
        if let Some(v) = env("WARDEN_SCAN_MIN_CONFIDENCE") {
            config.scan.min_confidence = Some(v);
        }
        if let Some(v) = env("WARDEN_SCAN_MAX_FILE_SIZE") {
            config.scan.max_file_size = Some(v);
        }
        if let Some(v) = env("WARDEN_FIX_MAX_SAFETY_CLASS") {
            config.fix.max_safety_class = Some(v);
        }
        if let Some(v) = env("WARDEN_FIX_DRY_RUN") {
            config.fix.dry_run = Some(v);
        }
        if let Some(v) = env("WARDEN_FIX_MIN_CONFIDENCE") {
            config.fix.min_confidence = Some(v);
        }
        if let Some(v) = env("WARDEN_FIX_TIMEOUT_SECS") {
            config.fix.timeout_secs = Some(v);
        }
        if let Ok(v) = std::env::var("WARDEN_AUDIT_DB_PATH") {
            config.audit.db_path = Some(v);
        }
    }

    /// Apply CLI overrides (highest priority).
    fn apply_cli_overrides(config: &mut WardenConfig, cli: &CliOverrides) {
        if let Some(v) = cli.scan_threads {
            config.scan.threads = Some(v);
        }
        if let Some(v) = cli.scan_min_confidence {
            config.scan.min_confidence = Some(v);
        }
        if let Some(v) = cli.fix_dry_run {
            config.fix.dry_run = Some(v);
        }
        if let Some(v) = cli.fix_max_safety_class {
            config.fix.max_safety_class = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
