//! Configuration system for Warden.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod audit_config;
pub mod fix_config;
pub mod scan_config;
pub mod warden_config;

pub use audit_config::AuditConfig;
pub use fix_config::{FixConfig, FixPolicy};
pub use scan_config::ScanConfig;
pub use warden_config::{CliOverrides, WardenConfig};
