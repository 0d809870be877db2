//! Syntax provider errors.

use super::error_code::{self, WardenErrorCode};

/// Errors returned by a syntax-tree provider.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("Grammar setup failed for {language}: {message}")]
    GrammarFailed { language: String, message: String },

    #[error("Parser produced no tree for {language}")]
    NoTree { language: String },

    #[error("Syntax errors in {language} source: {count} error node(s)")]
    SyntaxErrors { language: String, count: u32 },
}

impl WardenErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage { .. } => error_code::UNSUPPORTED_LANGUAGE,
            _ => error_code::PARSE_ERROR,
        }
    }
}
