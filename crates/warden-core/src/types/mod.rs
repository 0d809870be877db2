//! Shared value types.

pub mod hashing;
pub mod severity;
pub mod span;

pub use hashing::ContentHash;
pub use severity::{SafetyClass, Severity};
pub use span::{line_of, Span};
