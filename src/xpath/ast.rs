//! Abstract syntax tree for XPath 1.0 expressions.
//!
//! Follows the grammar of <https://www.w3.org/TR/xpath-10/>. Qualified names
//! are kept split into prefix and local part; prefixes are resolved to
//! namespace URIs only at evaluation time, against the bindings the
//! expression is evaluated with.

use std::fmt;
use std::str::FromStr;

/// An XPath expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),

    String(String),

    /// `$name`. There are no variable bindings, so evaluating one fails.
    Variable(String),

    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    UnaryNeg(Box<Expr>),

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    /// Relative location path, evaluated from the context node.
    Path { steps: Vec<Step> },

    /// Absolute location path, evaluated from the Document node.
    RootPath { steps: Vec<Step> },

    /// A primary expression with predicates, optionally followed by a
    /// relative path (`(//a)[1]/b`).
    Filter {
        expr: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },

    Union(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

/// One step of a location path: `axis::node-test[predicate]*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The `descendant-or-self::node()` step that `//` abbreviates.
    #[must_use]
    pub fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    Parent,
    Ancestor,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Attribute,
    Namespace,
    Self_,
    DescendantOrSelf,
    AncestorOrSelf,
}

impl Axis {
    const ALL: [(Self, &'static str); 13] = [
        (Self::Child, "child"),
        (Self::Descendant, "descendant"),
        (Self::Parent, "parent"),
        (Self::Ancestor, "ancestor"),
        (Self::FollowingSibling, "following-sibling"),
        (Self::PrecedingSibling, "preceding-sibling"),
        (Self::Following, "following"),
        (Self::Preceding, "preceding"),
        (Self::Attribute, "attribute"),
        (Self::Namespace, "namespace"),
        (Self::Self_, "self"),
        (Self::DescendantOrSelf, "descendant-or-self"),
        (Self::AncestorOrSelf, "ancestor-or-self"),
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(axis, _)| *axis == self)
            .map_or("child", |(_, name)| name)
    }

    /// Reverse axes number their positions from the context node outwards.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor | Self::AncestorOrSelf | Self::Preceding | Self::PrecedingSibling
        )
    }
}

impl FromStr for Axis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(axis, _)| *axis)
            .ok_or(())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step selects on its axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test. With a prefix it matches by the prefix's namespace URI;
    /// without one it matches only nodes in no namespace.
    Name {
        prefix: Option<String>,
        local: String,
    },

    /// `*`: any node of the axis' principal type.
    Wildcard,

    /// `prefix:*`: any principal node in the prefix's namespace.
    PrefixWildcard(String),

    Node,

    Text,

    Comment,

    ProcessingInstruction(Option<String>),
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name {
                prefix: Some(prefix),
                local,
            } => write!(f, "{prefix}:{local}"),
            Self::Name { prefix: None, local } => f.write_str(local),
            Self::Wildcard => f.write_str("*"),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}:*"),
            Self::Node => f.write_str("node()"),
            Self::Text => f.write_str("text()"),
            Self::Comment => f.write_str("comment()"),
            Self::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            Self::ProcessingInstruction(Some(name)) => {
                write!(f, "processing-instruction('{name}')")
            }
        }
    }
}
