//! Source files handed to the scanner.

use std::path::Path;

use warden_core::errors::ParseError;
use warden_core::types::{line_of, ContentHash};

use super::Language;
use crate::syntax::{SyntaxTree, SyntaxTreeProvider};

/// One file's content plus an optional syntax tree.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path as reported in violations and used for fix application.
    pub path: String,
    pub language: Language,
    pub content: String,
    pub tree: Option<SyntaxTree>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, language: Language, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            content: content.into(),
            tree: None,
        }
    }

    /// Read a file from disk, detecting its language from the extension.
    /// Returns `Ok(None)` for unsupported extensions.
    pub fn read(path: &Path) -> std::io::Result<Option<Self>> {
        let Some(language) = Language::from_path(path) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(path)?;
        Ok(Some(Self::new(path.to_string_lossy().replace('\\', "/"), language, content)))
    }

    pub fn with_tree(mut self, tree: SyntaxTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Parse the content with `provider` and attach the resulting tree.
    pub fn parse_with(&mut self, provider: &dyn SyntaxTreeProvider) -> Result<(), ParseError> {
        self.tree = Some(provider.parse(self.language, &self.content)?);
        Ok(())
    }

    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of_str(&self.content)
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        line_of(&self.content, offset)
    }
}
