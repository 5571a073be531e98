//! Parser trait definition

use crate::parser::types::DirectDependency;

/// Trait for parsing manifest files
pub trait Parser {
    /// Parse the content and extract the directly declared dependencies
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to parse the file structure
    #[error("Failed to parse file: {0}")]
    ParseFailed(String),

    /// Invalid syntax in the file
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}
