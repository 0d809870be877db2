//! Detector strategy trait.

use warden_core::errors::DetectionError;

use crate::ensemble::RawFinding;
use crate::source::{Language, SourceFile};

/// One independent detection algorithm.
///
/// Strategies hold only immutable compiled state; the scorer shares them
/// across worker threads and may run them in any order.
pub trait DetectorStrategy: Send + Sync {
    /// Unique identifier, used for statistics and adaptive weights.
    fn id(&self) -> &str;

    /// Whether this strategy has anything to check in `language`.
    fn supports(&self, language: Language) -> bool;

    /// Scan one file.
    fn scan(&self, file: &SourceFile) -> Result<Vec<RawFinding>, DetectionError>;
}
