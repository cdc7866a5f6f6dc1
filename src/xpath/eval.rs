//! `XPath` 1.0 expression evaluator.
//!
//! Walks an [`Expr`] AST (produced by [`super::parser::parse`]) against a
//! [`Document`] and produces an [`XPathValue`].
//!
//! # Evaluation Context
//!
//! Every expression is evaluated with respect to a context node, a context
//! position and size, and a set of prefix bindings. Prefixes in name tests
//! are resolved only through those bindings, never through the declarations
//! in the document, so `h:td` matches any `td` element in the namespace the
//! caller bound `h` to, whatever prefix the document itself uses.
//!
//! # Location Paths
//!
//! All axes except `namespace` are supported. Attributes are first-class
//! nodes ([`XPathNode::Attribute`]); namespace declarations are not
//! attributes and never appear on the attribute axis. Results are kept in
//! document order without duplicates.
//!
//! # Functions
//!
//! The 27 core function library functions are implemented. There are no
//! variable bindings: any `$name` reference fails with
//! [`XPathError::UndefinedVariable`].

use std::cmp::Ordering;

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::types::{format_xpath_number, parse_xpath_number, XPathError, XPathNode, XPathValue};
use crate::namespace::NamespaceTable;
use crate::tree::{Attribute, Document, NodeId, NodeKind, XML_NAMESPACE};

/// The evaluation context: document, context node, position and size, and
/// the prefix bindings name tests are resolved against.
#[derive(Debug, Clone, Copy)]
pub struct XPathContext<'a> {
    doc: &'a Document,
    node: XPathNode,
    position: usize,
    size: usize,
    namespaces: Option<&'a NamespaceTable>,
}

impl<'a> XPathContext<'a> {
    /// Creates a context at `node` with no prefix bindings other than `xml`.
    #[must_use]
    pub fn new(doc: &'a Document, node: impl Into<XPathNode>) -> Self {
        Self {
            doc,
            node: node.into(),
            position: 1,
            size: 1,
            namespaces: None,
        }
    }

    /// Resolves name test prefixes through `namespaces`.
    #[must_use]
    pub fn with_namespaces(mut self, namespaces: &'a NamespaceTable) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    /// Evaluates `expr` in this context.
    pub fn evaluate(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        self.eval_expr(expr)
    }

    fn at(&self, node: XPathNode, position: usize, size: usize) -> Self {
        Self {
            node,
            position,
            size,
            ..*self
        }
    }

    // -----------------------------------------------------------------------
    // Internal expression dispatch
    // -----------------------------------------------------------------------

    fn eval_expr(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        match expr {
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::String(s) => Ok(XPathValue::String(s.clone())),
            Expr::Variable(name) => Err(XPathError::UndefinedVariable { name: name.clone() }),
            Expr::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right),
            Expr::UnaryNeg(inner) => {
                let value = self.eval_expr(inner)?;
                Ok(XPathValue::Number(-self.number(&value)))
            }
            Expr::FunctionCall { name, args } => self.eval_function(name, args),
            Expr::Path { steps } => self.eval_steps(vec![self.node], steps),
            Expr::RootPath { steps } => {
                self.eval_steps(vec![XPathNode::Node(self.doc.root())], steps)
            }
            Expr::Filter {
                expr,
                predicates,
                steps,
            } => self.eval_filter(expr, predicates, steps),
            Expr::Union(left, right) => {
                let mut nodes = self.eval_node_set(left)?;
                nodes.extend(self.eval_node_set(right)?);
                self.sort_document_order(&mut nodes);
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    fn eval_node_set(&self, expr: &Expr) -> Result<Vec<XPathNode>, XPathError> {
        match self.eval_expr(expr)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(type_error("node-set", &other)),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn eval_binary_op(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<XPathValue, XPathError> {
        match op {
            BinaryOp::And => {
                if !self.eval_expr(left)?.to_boolean() {
                    return Ok(XPathValue::Boolean(false));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right)?.to_boolean()))
            }
            BinaryOp::Or => {
                if self.eval_expr(left)?.to_boolean() {
                    return Ok(XPathValue::Boolean(true));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right)?.to_boolean()))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let ln = self.number(&self.eval_expr(left)?);
                let rn = self.number(&self.eval_expr(right)?);
                let result = match op {
                    BinaryOp::Add => ln + rn,
                    BinaryOp::Sub => ln - rn,
                    BinaryOp::Mul => ln * rn,
                    BinaryOp::Div => ln / rn,
                    _ => ln % rn,
                };
                Ok(XPathValue::Number(result))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                let eq = self.compare_equality(&lv, &rv, op == BinaryOp::Neq);
                Ok(XPathValue::Boolean(eq))
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                Ok(XPathValue::Boolean(self.compare_relational(op, &lv, &rv)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn eval_steps(
        &self,
        mut nodes: Vec<XPathNode>,
        steps: &[Step],
    ) -> Result<XPathValue, XPathError> {
        for step in steps {
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(XPathValue::NodeSet(nodes))
    }

    fn eval_filter(
        &self,
        expr: &Expr,
        predicates: &[Expr],
        steps: &[Step],
    ) -> Result<XPathValue, XPathError> {
        let value = self.eval_expr(expr)?;
        if predicates.is_empty() && steps.is_empty() {
            return Ok(value);
        }
        let mut nodes = match value {
            XPathValue::NodeSet(nodes) => nodes,
            other => return Err(type_error("node-set", &other)),
        };
        for predicate in predicates {
            nodes = self.apply_predicate(nodes, predicate)?;
        }
        self.eval_steps(nodes, steps)
    }

    fn apply_step(&self, input: &[XPathNode], step: &Step) -> Result<Vec<XPathNode>, XPathError> {
        let namespace = match &step.node_test {
            NodeTest::Name {
                prefix: Some(prefix),
                ..
            }
            | NodeTest::PrefixWildcard(prefix) => Some(self.resolve_prefix(prefix)?),
            _ => None,
        };

        let mut result = Vec::new();
        for &node in input {
            // Axis order, so positional predicates count along the axis.
            let mut selected: Vec<XPathNode> = self
                .expand_axis(node, step.axis)
                .into_iter()
                .filter(|&n| self.node_matches(n, &step.node_test, step.axis, namespace))
                .collect();
            for predicate in &step.predicates {
                selected = self.apply_predicate(selected, predicate)?;
            }
            result.extend(selected);
        }

        if input.len() > 1 {
            self.sort_document_order(&mut result);
        } else if step.axis.is_reverse() {
            result.reverse();
        }
        Ok(result)
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<&'a str, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.namespaces
            .and_then(|table| table.resolve(prefix))
            .ok_or_else(|| XPathError::UnresolvedPrefix {
                prefix: prefix.to_owned(),
            })
    }

    fn apply_predicate(
        &self,
        nodes: Vec<XPathNode>,
        predicate: &Expr,
    ) -> Result<Vec<XPathNode>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let ctx = self.at(node, i + 1, size);
            let keep = match ctx.eval_expr(predicate)? {
                #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    // -----------------------------------------------------------------------
    // Axis expansion
    // -----------------------------------------------------------------------

    /// Nodes on `axis` from `node`, nearest first for reverse axes.
    fn expand_axis(&self, node: XPathNode, axis: Axis) -> Vec<XPathNode> {
        let doc = self.doc;
        let id = match node {
            XPathNode::Node(id) => id,
            XPathNode::Attribute { element, .. } => {
                return self.expand_attribute_axis(node, element, axis);
            }
        };
        match axis {
            Axis::Child => tree_nodes(doc.children(id)),
            Axis::Descendant => tree_nodes(doc.descendants(id)),
            Axis::DescendantOrSelf => tree_nodes(std::iter::once(id).chain(doc.descendants(id))),
            Axis::Parent => tree_nodes(doc.parent(id)),
            Axis::Ancestor => tree_nodes(doc.ancestors(id).skip(1)),
            Axis::AncestorOrSelf => tree_nodes(doc.ancestors(id)),
            Axis::FollowingSibling => tree_nodes(std::iter::successors(doc.next_sibling(id), |&s| {
                doc.next_sibling(s)
            })),
            Axis::PrecedingSibling => tree_nodes(std::iter::successors(doc.prev_sibling(id), |&s| {
                doc.prev_sibling(s)
            })),
            Axis::Following => self.following(id),
            Axis::Preceding => self.preceding(id),
            Axis::Attribute => doc
                .attributes(id)
                .iter()
                .enumerate()
                .filter(|(_, attr)| !attr.is_namespace_declaration())
                .map(|(index, _)| XPathNode::Attribute { element: id, index })
                .collect(),
            Axis::Self_ => vec![node],
            Axis::Namespace => Vec::new(),
        }
    }

    fn expand_attribute_axis(
        &self,
        node: XPathNode,
        element: NodeId,
        axis: Axis,
    ) -> Vec<XPathNode> {
        match axis {
            Axis::Self_ | Axis::DescendantOrSelf => vec![node],
            Axis::Parent => vec![XPathNode::Node(element)],
            Axis::Ancestor => self.doc.ancestors(element).map(XPathNode::Node).collect(),
            Axis::AncestorOrSelf => std::iter::once(node)
                .chain(self.doc.ancestors(element).map(XPathNode::Node))
                .collect(),
            // An attribute sits between its element and the element's content.
            Axis::Following => self
                .doc
                .descendants(element)
                .map(XPathNode::Node)
                .chain(self.following(element))
                .collect(),
            Axis::Preceding => self.preceding(element),
            _ => Vec::new(),
        }
    }

    fn following(&self, id: NodeId) -> Vec<XPathNode> {
        let doc = self.doc;
        let mut result = Vec::new();
        for anc in doc.ancestors(id) {
            let mut sib = doc.next_sibling(anc);
            while let Some(s) = sib {
                result.push(XPathNode::Node(s));
                result.extend(doc.descendants(s).map(XPathNode::Node));
                sib = doc.next_sibling(s);
            }
        }
        result
    }

    fn preceding(&self, id: NodeId) -> Vec<XPathNode> {
        let doc = self.doc;
        let mut result = Vec::new();
        for anc in doc.ancestors(id) {
            let mut sib = doc.prev_sibling(anc);
            while let Some(s) = sib {
                let descendants: Vec<_> = doc.descendants(s).collect();
                result.extend(descendants.into_iter().rev().map(XPathNode::Node));
                result.push(XPathNode::Node(s));
                sib = doc.prev_sibling(s);
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Node tests
    // -----------------------------------------------------------------------

    /// `namespace` is the resolved URI of the test's prefix, if it has one.
    fn node_matches(
        &self,
        node: XPathNode,
        test: &NodeTest,
        axis: Axis,
        namespace: Option<&str>,
    ) -> bool {
        match node {
            XPathNode::Attribute { element, index } => {
                let Some(attr) = self.doc.attributes(element).get(index) else {
                    return false;
                };
                // Name tests select attributes only on the attribute axis.
                let principal = axis == Axis::Attribute;
                match test {
                    NodeTest::Node => true,
                    NodeTest::Wildcard => principal,
                    NodeTest::PrefixWildcard(_) => {
                        principal && attr.namespace.as_deref() == namespace
                    }
                    NodeTest::Name { local, .. } => {
                        principal && attr.name == *local && attr.namespace.as_deref() == namespace
                    }
                    _ => false,
                }
            }
            XPathNode::Node(id) => match (test, &self.doc.node(id).kind) {
                (_, NodeKind::DocumentType { .. }) => false,
                (NodeTest::Node, _)
                | (NodeTest::Text, NodeKind::Text { .. } | NodeKind::CData { .. })
                | (NodeTest::Comment, NodeKind::Comment { .. })
                | (NodeTest::Wildcard, NodeKind::Element { .. }) => true,
                (NodeTest::ProcessingInstruction(name), NodeKind::ProcessingInstruction { target, .. }) => {
                    name.as_ref().map_or(true, |n| n == target)
                }
                (NodeTest::Name { local, .. }, NodeKind::Element { name, namespace: ns, .. }) => {
                    name == local && ns.as_deref() == namespace
                }
                (NodeTest::PrefixWildcard(_), NodeKind::Element { namespace: ns, .. }) => {
                    ns.as_deref() == namespace
                }
                _ => false,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Document order
    // -----------------------------------------------------------------------

    fn sort_document_order(&self, nodes: &mut Vec<XPathNode>) {
        nodes.sort_by_cached_key(|&n| self.order_key(n));
        nodes.dedup();
    }

    /// Attributes sort after their element and before its children.
    fn order_key(&self, node: XPathNode) -> Vec<(u8, usize)> {
        let element_key = |id| {
            self.doc
                .order_key(id)
                .into_iter()
                .map(|p| (1, p))
                .collect::<Vec<_>>()
        };
        match node {
            XPathNode::Node(id) => element_key(id),
            XPathNode::Attribute { element, index } => {
                let mut key = element_key(element);
                key.push((0, index));
                key
            }
        }
    }

    // -----------------------------------------------------------------------
    // Function library
    // -----------------------------------------------------------------------

    fn eval_function(&self, name: &str, args: &[Expr]) -> Result<XPathValue, XPathError> {
        match name {
            // Node-set functions
            "last" | "position" => {
                check_arity(name, args, 0, Some(0))?;
                let n = if name == "last" { self.size } else { self.position };
                #[allow(clippy::cast_precision_loss)]
                Ok(XPathValue::Number(n as f64))
            }
            "count" => {
                check_arity(name, args, 1, Some(1))?;
                #[allow(clippy::cast_precision_loss)]
                Ok(XPathValue::Number(self.eval_node_set(&args[0])?.len() as f64))
            }
            "local-name" | "namespace-uri" | "name" => {
                let node = self.optional_node_arg(name, args)?;
                let result = node.map_or_else(String::new, |n| self.node_name(n, name));
                Ok(XPathValue::String(result))
            }
            "id" => {
                check_arity(name, args, 1, Some(1))?;
                // Without a DTD no attribute has type ID.
                self.eval_expr(&args[0])?;
                Ok(XPathValue::NodeSet(Vec::new()))
            }

            // String functions
            "string" => Ok(XPathValue::String(self.string_arg(name, args)?)),
            "concat" => {
                check_arity(name, args, 2, None)?;
                let mut result = String::new();
                for arg in args {
                    result.push_str(&self.string(&self.eval_expr(arg)?));
                }
                Ok(XPathValue::String(result))
            }
            "starts-with" | "contains" | "substring-before" | "substring-after" => {
                check_arity(name, args, 2, Some(2))?;
                let s = self.string(&self.eval_expr(&args[0])?);
                let pattern = self.string(&self.eval_expr(&args[1])?);
                Ok(match name {
                    "starts-with" => XPathValue::Boolean(s.starts_with(&pattern)),
                    "contains" => XPathValue::Boolean(s.contains(&pattern)),
                    "substring-before" => XPathValue::String(
                        s.split_once(&pattern)
                            .map_or_else(String::new, |(before, _)| before.to_owned()),
                    ),
                    _ => XPathValue::String(
                        s.split_once(&pattern)
                            .map_or_else(String::new, |(_, after)| after.to_owned()),
                    ),
                })
            }
            "substring" => self.fn_substring(args),
            "string-length" => {
                let s = self.string_arg(name, args)?;
                #[allow(clippy::cast_precision_loss)]
                Ok(XPathValue::Number(s.chars().count() as f64))
            }
            "normalize-space" => {
                let s = self.string_arg(name, args)?;
                Ok(XPathValue::String(
                    s.split_whitespace().collect::<Vec<_>>().join(" "),
                ))
            }
            "translate" => self.fn_translate(args),

            // Boolean functions
            "boolean" | "not" => {
                check_arity(name, args, 1, Some(1))?;
                let b = self.eval_expr(&args[0])?.to_boolean();
                Ok(XPathValue::Boolean(if name == "not" { !b } else { b }))
            }
            "true" | "false" => {
                check_arity(name, args, 0, Some(0))?;
                Ok(XPathValue::Boolean(name == "true"))
            }
            "lang" => self.fn_lang(args),

            // Number functions
            "number" => {
                check_arity(name, args, 0, Some(1))?;
                let n = match args.first() {
                    Some(arg) => self.number(&self.eval_expr(arg)?),
                    None => parse_xpath_number(&self.string_value(self.node)),
                };
                Ok(XPathValue::Number(n))
            }
            "sum" => {
                check_arity(name, args, 1, Some(1))?;
                let total = self
                    .eval_node_set(&args[0])?
                    .into_iter()
                    .map(|n| parse_xpath_number(&self.string_value(n)))
                    .sum();
                Ok(XPathValue::Number(total))
            }
            "floor" | "ceiling" | "round" => {
                check_arity(name, args, 1, Some(1))?;
                let n = self.number(&self.eval_expr(&args[0])?);
                Ok(XPathValue::Number(match name {
                    "floor" => n.floor(),
                    "ceiling" => n.ceil(),
                    _ => xpath_round(n),
                }))
            }

            _ => Err(XPathError::UndefinedFunction {
                name: name.to_owned(),
            }),
        }
    }

    /// The node a `name()`-style function applies to: the context node when
    /// called without arguments, otherwise the first node of the argument.
    fn optional_node_arg(
        &self,
        function: &str,
        args: &[Expr],
    ) -> Result<Option<XPathNode>, XPathError> {
        check_arity(function, args, 0, Some(1))?;
        match args.first() {
            None => Ok(Some(self.node)),
            Some(arg) => Ok(self.eval_node_set(arg)?.first().copied()),
        }
    }

    fn string_arg(&self, function: &str, args: &[Expr]) -> Result<String, XPathError> {
        check_arity(function, args, 0, Some(1))?;
        match args.first() {
            Some(arg) => Ok(self.string(&self.eval_expr(arg)?)),
            None => Ok(self.string_value(self.node)),
        }
    }

    fn node_name(&self, node: XPathNode, function: &str) -> String {
        match node {
            XPathNode::Attribute { element, index } => {
                let Some(attr) = self.doc.attributes(element).get(index) else {
                    return String::new();
                };
                match function {
                    "local-name" => attr.name.clone(),
                    "namespace-uri" => attr.namespace.clone().unwrap_or_default(),
                    _ => attr.qualified_name(),
                }
            }
            XPathNode::Node(id) => match &self.doc.node(id).kind {
                NodeKind::Element { name, namespace, .. } => match function {
                    "local-name" => name.clone(),
                    "namespace-uri" => namespace.clone().unwrap_or_default(),
                    _ => self.doc.qualified_name(id).unwrap_or_default(),
                },
                NodeKind::ProcessingInstruction { target, .. } if function != "namespace-uri" => {
                    target.clone()
                }
                _ => String::new(),
            },
        }
    }

    fn fn_substring(&self, args: &[Expr]) -> Result<XPathValue, XPathError> {
        check_arity("substring", args, 2, Some(3))?;
        let s = self.string(&self.eval_expr(&args[0])?);
        let start = xpath_round(self.number(&self.eval_expr(&args[1])?));
        let chars: Vec<char> = s.chars().collect();
        #[allow(clippy::cast_precision_loss)]
        let len = chars.len() as f64;
        let end = match args.get(2) {
            Some(arg) => start + xpath_round(self.number(&self.eval_expr(arg)?)),
            None => len + 1.0,
        };
        if start.is_nan() || end.is_nan() {
            return Ok(XPathValue::String(String::new()));
        }

        // Characters at 1-based positions p with start <= p < end.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let first = (start - 1.0).max(0.0) as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let last = (end - 1.0).clamp(0.0, len) as usize;
        if first >= last {
            return Ok(XPathValue::String(String::new()));
        }
        Ok(XPathValue::String(chars[first..last].iter().collect()))
    }

    fn fn_translate(&self, args: &[Expr]) -> Result<XPathValue, XPathError> {
        check_arity("translate", args, 3, Some(3))?;
        let s = self.string(&self.eval_expr(&args[0])?);
        let from: Vec<char> = self.string(&self.eval_expr(&args[1])?).chars().collect();
        let to: Vec<char> = self.string(&self.eval_expr(&args[2])?).chars().collect();

        let result = s
            .chars()
            .filter_map(|c| match from.iter().position(|&f| f == c) {
                Some(pos) => to.get(pos).copied(),
                None => Some(c),
            })
            .collect();
        Ok(XPathValue::String(result))
    }

    fn fn_lang(&self, args: &[Expr]) -> Result<XPathValue, XPathError> {
        check_arity("lang", args, 1, Some(1))?;
        let target = self.string(&self.eval_expr(&args[0])?).to_lowercase();
        let lang = self
            .doc
            .ancestors(self.node.owner())
            .find_map(|n| self.doc.find_attribute(n, Some(XML_NAMESPACE), "lang"))
            .map(|attr: &Attribute| attr.value.to_lowercase());
        let matched = lang.is_some_and(|lang| {
            lang == target
                || lang
                    .strip_prefix(target.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        });
        Ok(XPathValue::Boolean(matched))
    }

    // -----------------------------------------------------------------------
    // Conversions that need the document
    // -----------------------------------------------------------------------

    fn number(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::NodeSet(_) => parse_xpath_number(&self.string(value)),
            _ => value.to_number(),
        }
    }

    fn string(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or_else(String::new, |&n| self.string_value(n)),
            XPathValue::Number(n) => format_xpath_number(*n),
            other => other.to_string(),
        }
    }

    /// The string-value of a node.
    fn string_value(&self, node: XPathNode) -> String {
        match node {
            XPathNode::Attribute { element, index } => self
                .doc
                .attributes(element)
                .get(index)
                .map_or_else(String::new, |attr| attr.value.clone()),
            XPathNode::Node(id) => self.doc.text_content(id),
        }
    }

    // -----------------------------------------------------------------------
    // Comparisons
    // -----------------------------------------------------------------------

    /// `=` (or `!=` when `negate`) with the node-set rules of XPath 1.0
    /// section 3.4: a node-set compares true if any member does.
    #[allow(clippy::float_cmp)]
    fn compare_equality(&self, lhs: &XPathValue, rhs: &XPathValue, negate: bool) -> bool {
        let eq_str = |a: &str, b: &str| (a == b) != negate;
        let eq_num = |a: f64, b: f64| (a == b) != negate;
        match (lhs, rhs) {
            (XPathValue::NodeSet(lns), XPathValue::NodeSet(rns)) => {
                let rvalues: Vec<String> = rns.iter().map(|&n| self.string_value(n)).collect();
                lns.iter().any(|&ln| {
                    let lv = self.string_value(ln);
                    rvalues.iter().any(|rv| eq_str(&lv, rv))
                })
            }
            (XPathValue::NodeSet(ns), XPathValue::Boolean(b))
            | (XPathValue::Boolean(b), XPathValue::NodeSet(ns)) => {
                (!ns.is_empty() == *b) != negate
            }
            (XPathValue::NodeSet(ns), XPathValue::Number(n))
            | (XPathValue::Number(n), XPathValue::NodeSet(ns)) => ns
                .iter()
                .any(|&node| eq_num(parse_xpath_number(&self.string_value(node)), *n)),
            (XPathValue::NodeSet(ns), XPathValue::String(s))
            | (XPathValue::String(s), XPathValue::NodeSet(ns)) => ns
                .iter()
                .any(|&node| eq_str(&self.string_value(node), s)),
            (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                (lhs.to_boolean() == rhs.to_boolean()) != negate
            }
            (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                eq_num(lhs.to_number(), rhs.to_number())
            }
            _ => eq_str(&self.string(lhs), &self.string(rhs)),
        }
    }

    fn compare_relational(&self, op: BinaryOp, lhs: &XPathValue, rhs: &XPathValue) -> bool {
        let cmp = |a: f64, b: f64| match a.partial_cmp(&b) {
            Some(Ordering::Less) => matches!(op, BinaryOp::Lt | BinaryOp::Lte),
            Some(Ordering::Equal) => matches!(op, BinaryOp::Lte | BinaryOp::Gte),
            Some(Ordering::Greater) => matches!(op, BinaryOp::Gt | BinaryOp::Gte),
            None => false,
        };
        let node_numbers = |nodes: &[XPathNode]| -> Vec<f64> {
            nodes
                .iter()
                .map(|&n| parse_xpath_number(&self.string_value(n)))
                .collect()
        };

        match (lhs, rhs) {
            (XPathValue::NodeSet(lns), XPathValue::NodeSet(rns)) => {
                let rnums = node_numbers(rns);
                node_numbers(lns)
                    .into_iter()
                    .any(|l| rnums.iter().any(|&r| cmp(l, r)))
            }
            (XPathValue::NodeSet(ns), XPathValue::Boolean(b)) => {
                cmp(f64::from(u8::from(!ns.is_empty())), f64::from(u8::from(*b)))
            }
            (XPathValue::Boolean(b), XPathValue::NodeSet(ns)) => {
                cmp(f64::from(u8::from(*b)), f64::from(u8::from(!ns.is_empty())))
            }
            (XPathValue::NodeSet(ns), other) => {
                let r = other.to_number();
                node_numbers(ns).into_iter().any(|l| cmp(l, r))
            }
            (other, XPathValue::NodeSet(ns)) => {
                let l = other.to_number();
                node_numbers(ns).into_iter().any(|r| cmp(l, r))
            }
            _ => cmp(lhs.to_number(), rhs.to_number()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn tree_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Vec<XPathNode> {
    nodes.into_iter().map(XPathNode::Node).collect()
}

fn type_error(expected: &str, found: &XPathValue) -> XPathError {
    XPathError::TypeError {
        expected: expected.to_owned(),
        found: found.type_name().to_owned(),
    }
}

/// Round half toward positive infinity, keeping `NaN` and infinities.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}

fn check_arity(
    function: &str,
    args: &[Expr],
    min: usize,
    max: Option<usize>,
) -> Result<(), XPathError> {
    let found = args.len();
    if found >= min && max.map_or(true, |max| found <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min} to {max}"),
        None => format!("at least {min}"),
    };
    Err(XPathError::InvalidArgCount {
        function: function.to_owned(),
        expected,
        found,
    })
}
