//! Node paths and document order.

use std::cmp::Ordering;

use super::{Document, NodeId, NodeKind};

impl Document {
    /// Builds an absolute location path that selects `id`.
    ///
    /// Element steps use the qualified name. An element that is in a
    /// namespace but has no prefix cannot be named in XPath 1.0 without a
    /// registered prefix, so it is written as `*`. A `[n]` position is added
    /// only when siblings would otherwise match the same step.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlpath::Document;
    ///
    /// let doc = Document::parse_str(
    ///     r#"<root><a/><a><b xmlns="urn:x"/></a></root>"#,
    /// ).unwrap();
    /// let b = doc.descendants(doc.root()).last().unwrap();
    /// assert_eq!(doc.node_path(b), "/root/a[2]/*");
    /// ```
    #[must_use]
    pub fn node_path(&self, id: NodeId) -> String {
        let mut steps: Vec<String> = self
            .ancestors(id)
            .take_while(|&n| n != self.root)
            .map(|n| self.path_step(n))
            .collect();
        if steps.is_empty() {
            return "/".to_string();
        }
        steps.reverse();
        let mut path = String::new();
        for step in steps {
            path.push('/');
            path.push_str(&step);
        }
        path
    }

    fn path_step(&self, id: NodeId) -> String {
        let step = match &self.node(id).kind {
            NodeKind::Element {
                name,
                prefix,
                namespace,
                ..
            } => match (prefix, namespace) {
                (Some(p), _) => format!("{p}:{name}"),
                (None, Some(_)) => "*".to_string(),
                (None, None) => name.clone(),
            },
            NodeKind::Text { .. } | NodeKind::CData { .. } => "text()".to_string(),
            NodeKind::Comment { .. } => "comment()".to_string(),
            NodeKind::ProcessingInstruction { target, .. } => {
                format!("processing-instruction('{target}')")
            }
            NodeKind::Document | NodeKind::DocumentType { .. } => return String::new(),
        };

        let Some(parent) = self.parent(id) else {
            return step;
        };
        let mut position = 0;
        let mut total = 0;
        for sibling in self.children(parent) {
            if self.same_step(id, sibling, &step) {
                total += 1;
                if sibling == id {
                    position = total;
                }
            }
        }
        if total > 1 {
            format!("{step}[{position}]")
        } else {
            step
        }
    }

    fn same_step(&self, id: NodeId, other: NodeId, step: &str) -> bool {
        match (&self.node(id).kind, &self.node(other).kind) {
            (NodeKind::Element { .. }, NodeKind::Element { .. }) => {
                step == "*"
                    || (self.node_name(id) == self.node_name(other)
                        && self.node_namespace(id) == self.node_namespace(other))
            }
            (
                NodeKind::Text { .. } | NodeKind::CData { .. },
                NodeKind::Text { .. } | NodeKind::CData { .. },
            )
            | (NodeKind::Comment { .. }, NodeKind::Comment { .. }) => true,
            (
                NodeKind::ProcessingInstruction { target: a, .. },
                NodeKind::ProcessingInstruction { target: b, .. },
            ) => a == b,
            _ => false,
        }
    }

    /// Returns the child positions leading from the Document node to `id`.
    ///
    /// Keys compare lexicographically in document order, including after
    /// mutations, which is not true of [`NodeId`] order.
    #[must_use]
    pub fn order_key(&self, id: NodeId) -> Vec<usize> {
        let mut key: Vec<usize> = self
            .ancestors(id)
            .take_while(|&n| n != self.root)
            .map(|n| match self.parent(n) {
                Some(parent) => self.children(parent).take_while(|&c| c != n).count(),
                None => 0,
            })
            .collect();
        key.reverse();
        key
    }

    /// Compares two nodes by document order.
    #[must_use]
    pub fn compare_document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.order_key(a).cmp(&self.order_key(b))
    }
}
