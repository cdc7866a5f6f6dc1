//! Error types.
//!
//! [`Error`] is the single error type of the public API. Each variant is a
//! discrete outcome a caller can match on; no operation returns partial
//! results alongside an error. Parse failures carry a [`SourceLocation`].

use std::fmt;

use crate::xpath::XPathError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl SourceLocation {
    /// Computes the line and column of `byte_offset` within `input`.
    ///
    /// Offsets past the end of `input` are clamped to its length.
    #[must_use]
    pub fn from_offset(input: &str, byte_offset: usize) -> Self {
        let mut end = byte_offset.min(input.len());
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        let before = &input[..end];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column).unwrap_or(u32::MAX),
            byte_offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error returned when XML input cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Errors returned by document queries and mutations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed expression, an expression using an unregistered prefix, or
    /// an expression that has to select nodes but yields a scalar.
    #[error("invalid XPath expression '{expression}': {reason}")]
    InvalidXPath { expression: String, reason: String },

    /// A namespace URI was required but absent or empty.
    #[error("namespace URI must not be empty")]
    InvalidNamespaceUri,

    /// A qualified name used a prefix that does not resolve.
    #[error("namespace prefix '{0}' is not registered")]
    InvalidNamespacePrefix(String),

    /// The element already declares `prefix` with another URI.
    #[error("namespace prefix '{prefix}' is already declared as '{uri}'")]
    NamespaceAlreadyDeclared { prefix: String, uri: String },

    /// An argument was rejected before touching the document.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The path resolved but selected nothing.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element exists but has no such attribute.
    #[error("attribute '{name}' not found on {path}")]
    AttributeNotFound { path: String, name: String },

    /// A single-element accessor matched more than one node.
    #[error("path {path} is not unique ({count} matches)")]
    ElementPathNotUnique { path: String, count: usize },

    /// A 1-based index outside the available range.
    #[error("index {index} out of range (1..={count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// The path selected a node that is not an element.
    #[error("{0} does not select an element")]
    NotAnElement(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A failure that is not attributable to the caller's input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps an XPath failure for `expression`.
    ///
    /// Evaluator bugs surface as [`Error::Internal`]; everything else is the
    /// caller's expression and becomes [`Error::InvalidXPath`].
    pub(crate) fn from_xpath(expression: &str, err: XPathError) -> Self {
        match err {
            XPathError::Internal { message } => Self::Internal(message),
            other => Self::InvalidXPath {
                expression: expression.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
