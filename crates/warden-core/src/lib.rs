//! warden-core: shared contract for the Warden analysis and fix engine.
//!
//! - Errors: one `thiserror` enum per subsystem with stable error codes
//! - Types: severities, safety classes, spans, content hashes
//! - Audit: fix decision states, audit entries, the `AuditTrail` trait
//! - Config: layered TOML configuration
//! - Events: synchronous handler dispatch
//! - Tracing: subscriber setup and structured field names

pub mod audit;
pub mod config;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod traits;
pub mod types;

pub use config::{FixPolicy, WardenConfig};
