//! Syntax trees: neutral arena model, provider trait, tree-sitter adapter.

pub mod provider;
pub mod tree;
pub mod treesitter;

pub use provider::SyntaxTreeProvider;
pub use tree::{NodeId, SyntaxNode, SyntaxTree};
pub use treesitter::TreeSitterProvider;
