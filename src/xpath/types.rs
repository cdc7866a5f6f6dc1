//! XPath 1.0 values, node handles and errors.
//!
//! Conversions follow sections 4.1-4.4 of the XPath 1.0 recommendation.
//! Node-set conversions need the document to compute string-values, so they
//! live on the evaluator; the methods here cover the scalar cases.

use std::fmt;

use crate::tree::NodeId;

// ---------------------------------------------------------------------------
// XPathNode
// ---------------------------------------------------------------------------

/// A node selected by an expression.
///
/// Attributes are not tree nodes, so they are addressed by their owner
/// element and their position in its attribute list. That position is only
/// stable until the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathNode {
    Node(NodeId),
    Attribute { element: NodeId, index: usize },
}

impl XPathNode {
    /// The tree node, or `None` for an attribute.
    #[must_use]
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Attribute { .. } => None,
        }
    }

    /// The tree node itself, or the owner element of an attribute.
    #[must_use]
    pub fn owner(self) -> NodeId {
        match self {
            Self::Node(id) | Self::Attribute { element: id, .. } => id,
        }
    }
}

impl From<NodeId> for XPathNode {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

// ---------------------------------------------------------------------------
// XPathValue
// ---------------------------------------------------------------------------

/// The result of evaluating an expression.
#[derive(Debug, Clone)]
pub enum XPathValue {
    Boolean(bool),
    Number(f64),
    String(String),
    /// Nodes in document order without duplicates.
    NodeSet(Vec<XPathNode>),
}

impl XPathValue {
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    /// Converts a scalar to a number. Node-sets yield `NaN` here; the
    /// evaluator converts them through their first node's string-value.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::String(s) => parse_xpath_number(s),
            Self::NodeSet(_) => f64::NAN,
        }
    }

    #[must_use]
    pub fn as_node_set(&self) -> Option<&[XPathNode]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NodeSet(_) => "node-set",
        }
    }
}

impl fmt::Display for XPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_xpath_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::NodeSet(nodes) => write!(f, "<node-set of {} nodes>", nodes.len()),
        }
    }
}

impl PartialEq for XPathValue {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::NodeSet(a), Self::NodeSet(b)) => a == b,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Number conversions
// ---------------------------------------------------------------------------

/// Formats a number the way XPath's `string()` does: integers without a
/// decimal point, `NaN`, `Infinity`, and no negative zero.
#[must_use]
pub fn format_xpath_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    #[allow(clippy::cast_possible_truncation)]
    if n.fract() == 0.0 && n.abs() < 1e18 {
        return (n as i64).to_string();
    }
    n.to_string()
}

/// Parses the XPath `Number` production with optional surrounding
/// whitespace and a leading minus. Anything else is `NaN`, including
/// exponents and `inf`, which Rust's float parser would otherwise accept.
#[must_use]
pub fn parse_xpath_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

// ---------------------------------------------------------------------------
// XPathError
// ---------------------------------------------------------------------------

/// Errors from compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("undefined namespace prefix '{prefix}'")]
    UnresolvedPrefix { prefix: String },

    #[error("type error: expected {expected}, found {found}")]
    TypeError { expected: String, found: String },

    #[error("undefined variable ${name}")]
    UndefinedVariable { name: String },

    #[error("unknown function {name}()")]
    UndefinedFunction { name: String },

    #[error("{function}() takes {expected} argument(s), {found} given")]
    InvalidArgCount {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl XPathError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_to_boolean() {
        assert!(XPathValue::Number(2.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        assert!(!XPathValue::NodeSet(Vec::new()).to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(XPathValue::Boolean(true).to_number(), 1.0);
        assert_eq!(XPathValue::String(" 12.5 ".into()).to_number(), 12.5);
        assert!(XPathValue::NodeSet(Vec::new()).to_number().is_nan());
    }

    #[rstest]
    #[case(1.0, "1")]
    #[case(-0.0, "0")]
    #[case(0.5, "0.5")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    fn test_format_xpath_number(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_xpath_number(value), expected);
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case("-3.5", Some(-3.5))]
    #[case(".5", Some(0.5))]
    #[case("1e3", None)]
    #[case("inf", None)]
    #[case("", None)]
    #[case(".", None)]
    #[case("1.2.3", None)]
    fn test_parse_xpath_number(#[case] input: &str, #[case] expected: Option<f64>) {
        let parsed = parse_xpath_number(input);
        match expected {
            Some(n) => assert_eq!(parsed, n),
            None => assert!(parsed.is_nan()),
        }
    }

    #[test]
    fn test_xpath_node_owner() {
        let doc = crate::tree::Document::with_root_element("r");
        let root = doc.root_element().unwrap_or(doc.root());
        let attr = XPathNode::Attribute {
            element: root,
            index: 0,
        };
        assert_eq!(attr.owner(), root);
        assert_eq!(attr.node_id(), None);
        assert_eq!(XPathNode::from(root).node_id(), Some(root));
    }

    #[test]
    fn test_error_display() {
        let err = XPathError::UnresolvedPrefix { prefix: "h".into() };
        assert_eq!(err.to_string(), "undefined namespace prefix 'h'");
    }
}
