use thiserror::Error;

/// Errors produced while diffing, matching, or rendering XML trees.
///
/// Parsing and writing failures bubble up through [`crate::parser::ParseError`]
/// and [`crate::writer::WriteError`]; this enum covers the diff-time error
/// kinds plus thin wrappers around those two so a caller driving the whole
/// pipeline can propagate a single error type with `?`.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Both arguments to a diff must be trees with a root element.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An XPath step resolved to zero matching nodes.
    #[error("path not found: {0}")]
    PathNotFound(String),
    /// An XPath step without an explicit predicate resolved to more than one node.
    #[error("ambiguous path: {0}")]
    AmbiguousPath(String),
    /// Formatter configuration is internally contradictory.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    /// Failure while parsing XML into a [`crate::tree::Tree`].
    #[error(transparent)]
    Parse(#[from] crate::parser::ParseError),
    /// Failure while serializing a [`crate::tree::Tree`] to XML.
    #[error(transparent)]
    Write(#[from] crate::writer::WriteError),
}
