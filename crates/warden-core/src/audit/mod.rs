//! Audit contract: decision states, entries, and the trail trait.

pub mod trail;
pub mod types;

pub use trail::{replay_state, AuditTrail};
pub use types::{now_ms, Actor, AuditEntry, DecisionId, FixState};
