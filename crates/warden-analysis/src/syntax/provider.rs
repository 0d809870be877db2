//! Syntax-tree provider seam.

use warden_core::errors::ParseError;

use super::SyntaxTree;
use crate::source::Language;

/// Anything that can turn source text into a `SyntaxTree`.
///
/// Providers are error-tolerant: a tree with ERROR nodes is still returned
/// as `Ok`. Callers decide whether error nodes matter.
pub trait SyntaxTreeProvider: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, language: Language) -> bool;

    fn parse(&self, language: Language, source: &str) -> Result<SyntaxTree, ParseError>;
}
