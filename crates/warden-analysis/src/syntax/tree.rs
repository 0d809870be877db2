//! Provider-neutral syntax tree stored as a flat node arena.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use warden_core::types::Span;

use crate::source::Language;

/// Index of a node within its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: String,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
    /// ERROR or MISSING node inserted by an error-recovering parser.
    pub is_error: bool,
}

/// A parsed tree. Node 0 is the root; children always follow their parent
/// in the arena, so a linear walk is a pre-order traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    language: Language,
    nodes: Vec<SyntaxNode>,
    error_count: u32,
}

impl SyntaxTree {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            nodes: Vec::new(),
            error_count: 0,
        }
    }

    /// Append a node, linking it under `parent`.
    pub fn push(
        &mut self,
        kind: impl Into<String>,
        span: Span,
        parent: Option<NodeId>,
        is_error: bool,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if let Some(p) = parent {
            if let Some(parent_node) = self.nodes.get_mut(p.0 as usize) {
                parent_node.children.push(id);
            }
        }
        if is_error {
            self.error_count += 1;
        }
        self.nodes.push(SyntaxNode {
            kind: kind.into(),
            span,
            parent,
            children: SmallVec::new(),
            is_error,
        });
        id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn root(&self) -> Option<&SyntaxNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order iteration over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn nodes_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a SyntaxNode> + 'a {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Source text covered by `node`.
    pub fn text_of<'s>(&self, node: &SyntaxNode, source: &'s str) -> Option<&'s str> {
        node.span.slice(source)
    }
}
