//! `XPath` 1.0 query language implementation.
//!
//! Expressions are tokenized by [`lexer`], parsed into an [`ast::Expr`] by
//! [`parser`] and evaluated against a [`Document`] by [`XPathContext`].
//! Namespace prefixes in name tests are resolved through a
//! [`NamespaceTable`], not through the declarations in the document.
//!
//! # Quick Start
//!
//! ```
//! use xmlpath::{Document, NamespaceTable};
//! use xmlpath::xpath::{evaluate_with_namespaces, XPathValue};
//!
//! let doc = Document::parse_str(r#"<r xmlns:a="urn:a"><a:x>1</a:x><a:x>2</a:x></r>"#).unwrap();
//! let mut table = NamespaceTable::new();
//! table.register("urn:a", "n").unwrap();
//!
//! let result = evaluate_with_namespaces(&doc, doc.root(), "sum(/r/n:x)", &table).unwrap();
//! assert_eq!(result, XPathValue::Number(3.0));
//! ```
//!
//! # Known Limitations
//!
//! - The `namespace::` axis is parsed but always selects nothing.
//! - There are no variable bindings.
//!
//! # Submodules
//!
//! - [`ast`]: syntax tree types.
//! - [`lexer`]: tokenizer.
//! - [`parser`]: recursive descent parser.
//! - [`eval`]: evaluator.
//! - [`types`]: values, node handles and errors.
//! - [`cache`]: memoized results keyed by expression text.

pub mod ast;
pub mod cache;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod types;

pub use cache::{CacheStats, ExpressionCache};
pub use eval::XPathContext;
pub use types::{XPathError, XPathNode, XPathValue};

use indexmap::IndexSet;

use crate::namespace::NamespaceTable;
use crate::tree::{Document, NodeId};
use crate::util::qname::split_qname;
use lexer::Token;

/// Evaluates `expression` at `context_node` with no prefix bindings other
/// than `xml`.
pub fn evaluate(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
) -> Result<XPathValue, XPathError> {
    let expr = parser::parse(expression)?;
    XPathContext::new(doc, context_node).evaluate(&expr)
}

/// Evaluates `expression` at `context_node`, resolving prefixes through
/// `namespaces`.
pub fn evaluate_with_namespaces(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
    namespaces: &NamespaceTable,
) -> Result<XPathValue, XPathError> {
    let expr = parser::parse(expression)?;
    XPathContext::new(doc, context_node)
        .with_namespaces(namespaces)
        .evaluate(&expr)
}

/// Lists the namespace prefixes `expression` uses, in order of first
/// appearance.
///
/// Only tokenization is needed, so this succeeds on some expressions that
/// would later fail to parse.
///
/// ```
/// use xmlpath::xpath::referenced_prefixes;
///
/// let prefixes = referenced_prefixes("/h:table/h:tr[@x:id]/c:*").unwrap();
/// assert_eq!(prefixes, ["h", "x", "c"]);
/// ```
pub fn referenced_prefixes(expression: &str) -> Result<Vec<String>, XPathError> {
    let mut prefixes = IndexSet::new();
    for spanned in lexer::tokenize(expression)? {
        let prefix = match &spanned.token {
            Token::PrefixWildcard(prefix) => Some(prefix.as_str()),
            Token::Name(name) | Token::FunctionName(name) | Token::VariableReference(name) => {
                split_qname(name).0
            }
            _ => None,
        };
        if let Some(prefix) = prefix {
            prefixes.insert(prefix.to_owned());
        }
    }
    Ok(prefixes.into_iter().collect())
}
