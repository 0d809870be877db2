//! Observability for Warden.
//! `tracing` crate with `EnvFilter`, per-subsystem log levels.

pub mod fields;
pub mod setup;

pub use setup::{init_tracing, init_tracing_with_filter};
