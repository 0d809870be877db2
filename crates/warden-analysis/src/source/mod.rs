//! Source model: languages and files.

pub mod file;
pub mod language;

pub use file::SourceFile;
pub use language::Language;
