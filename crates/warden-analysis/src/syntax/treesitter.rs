//! Tree-sitter backed provider.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tree_sitter::{Parser, Tree};

use warden_core::errors::ParseError;
use warden_core::types::Span;

use super::{NodeId, SyntaxTree, SyntaxTreeProvider};
use crate::source::Language;

thread_local! {
    static PARSERS: RefCell<FxHashMap<Language, Parser>> = RefCell::new(FxHashMap::default());
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
    }
}

/// Parses with tree-sitter, keeping one parser per language per thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterProvider;

impl TreeSitterProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SyntaxTreeProvider for TreeSitterProvider {
    fn name(&self) -> &str {
        "tree-sitter"
    }

    fn supports(&self, _language: Language) -> bool {
        true
    }

    fn parse(&self, language: Language, source: &str) -> Result<SyntaxTree, ParseError> {
        let tree = PARSERS.with(|cell| {
            let mut parsers = cell.borrow_mut();
            let parser = match parsers.entry(language) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let mut parser = Parser::new();
                    parser
                        .set_language(&grammar(language))
                        .map_err(|err| ParseError::GrammarFailed {
                            language: language.name().to_string(),
                            message: err.to_string(),
                        })?;
                    e.insert(parser)
                }
            };
            parser.parse(source, None).ok_or_else(|| ParseError::NoTree {
                language: language.name().to_string(),
            })
        })?;
        Ok(convert(&tree, language))
    }
}

/// Copy a tree-sitter tree into the arena with an explicit cursor walk.
fn convert(tree: &Tree, language: Language) -> SyntaxTree {
    let mut out = SyntaxTree::new(language);
    let mut cursor = tree.walk();
    let mut parents: Vec<NodeId> = Vec::new();

    loop {
        let node = cursor.node();
        let id = out.push(
            node.kind(),
            Span::new(node.start_byte(), node.end_byte()),
            parents.last().copied(),
            node.is_error() || node.is_missing(),
        );

        if cursor.goto_first_child() {
            parents.push(id);
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
            parents.pop();
        }
    }
}
