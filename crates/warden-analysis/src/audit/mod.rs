//! Audit trail implementations that live next to the orchestrator.

pub mod memory;

pub use memory::InMemoryAuditTrail;
