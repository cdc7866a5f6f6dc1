use super::XmlDocument;
use crate::error::{Error, Result};
use crate::tree::{Attribute, NodeId, NodeKind};
use crate::xpath::XPathNode;

impl XmlDocument {
    // --- Expression queries ---

    /// Number of nodes `expression` selects. Selecting nothing is not an
    /// error.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidXPath`] if the expression is invalid, uses an
    /// unregistered prefix or does not yield a node-set.
    pub fn count_matches(&self, expression: &str) -> Result<usize> {
        Ok(self.select(expression)?.len())
    }

    /// Qualified name of the `index`-th (1-based) match. Text nodes are
    /// `#text`, comments `#comment`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if there is no such match.
    pub fn match_name(&self, expression: &str, index: usize) -> Result<String> {
        let node = self.nth_match(expression, index)?;
        Ok(self.node_name(node))
    }

    /// Absolute path of the `index`-th (1-based) match.
    ///
    /// Elements in a default namespace appear as `*`; attributes end in
    /// `/@name`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if there is no such match.
    pub fn match_path(&self, expression: &str, index: usize) -> Result<String> {
        match self.nth_match(expression, index)? {
            XPathNode::Node(id) => Ok(self.tree.node_path(id)),
            XPathNode::Attribute { element, index } => {
                let attr = self.attribute_at(element, index)?;
                Ok(format!(
                    "{}/@{}",
                    self.tree.node_path(element),
                    attr.qualified_name()
                ))
            }
        }
    }

    /// String value of the `index`-th (1-based) match.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if there is no such match.
    pub fn match_text(&self, expression: &str, index: usize) -> Result<String> {
        match self.nth_match(expression, index)? {
            XPathNode::Node(id) => Ok(self.tree.text_content(id)),
            XPathNode::Attribute { element, index } => {
                Ok(self.attribute_at(element, index)?.value.clone())
            }
        }
    }

    // --- Element accessors ---

    /// Succeeds if `path` selects exactly one element.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`], [`Error::ElementPathNotUnique`] or
    /// [`Error::NotAnElement`].
    pub fn check_element(&self, path: &str) -> Result<()> {
        self.locate_element(path).map(|_| ())
    }

    /// Text content of the element at `path`, or the value of the
    /// attribute at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`] or [`Error::ElementPathNotUnique`].
    pub fn text(&self, path: &str) -> Result<String> {
        match self.locate_node(path)? {
            XPathNode::Node(id) => Ok(self.tree.text_content(id)),
            XPathNode::Attribute { element, index } => {
                Ok(self.attribute_at(element, index)?.value.clone())
            }
        }
    }

    /// Namespace URI of the element at `path`.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::check_element`].
    pub fn element_namespace(&self, path: &str) -> Result<Option<String>> {
        let id = self.locate_element(path)?;
        Ok(self.tree.node_namespace(id).map(str::to_string))
    }

    /// Number of element children of the element at `path`.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::check_element`].
    pub fn child_count(&self, path: &str) -> Result<usize> {
        let id = self.locate_element(path)?;
        Ok(self.tree.element_children(id).count())
    }

    /// Qualified name of the `index`-th (1-based) element child.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if there is no such child.
    pub fn child_name(&self, path: &str, index: usize) -> Result<String> {
        let id = self.locate_element(path)?;
        let child = self.nth_element_child(id, index)?;
        Ok(self.tree.qualified_name(child).unwrap_or_default())
    }

    /// Number of element children named `qname`, whose prefix is resolved
    /// through the namespace table.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] if the prefix is not registered.
    pub fn named_children_count(&self, path: &str, qname: &str) -> Result<usize> {
        let id = self.locate_element(path)?;
        let (namespace, local) = self.namespaces.resolve_qname(qname)?;
        Ok(self
            .tree
            .element_children(id)
            .filter(|&child| {
                self.tree.node_name(child) == Some(local)
                    && self.tree.node_namespace(child) == namespace
            })
            .count())
    }

    // --- Attribute accessors ---

    /// Value of the attribute `qname` on the element at `path`. The prefix
    /// is resolved through the namespace table and matched by URI.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] for an unregistered prefix,
    /// [`Error::AttributeNotFound`] if the element has no such attribute.
    pub fn attribute(&self, path: &str, qname: &str) -> Result<String> {
        let id = self.locate_element(path)?;
        let (namespace, local) = self.namespaces.resolve_qname(qname)?;
        self.tree
            .find_attribute(id, namespace, local)
            .map(|attr| attr.value.clone())
            .ok_or_else(|| attribute_not_found(path, qname))
    }

    /// Succeeds if the element at `path` has the attribute `qname`.
    ///
    /// # Errors
    ///
    /// [`Error::AttributeNotFound`], also when the prefix is not registered.
    pub fn check_attribute(&self, path: &str, qname: &str) -> Result<()> {
        match self.attribute(path, qname) {
            Ok(_) => Ok(()),
            Err(Error::InvalidNamespacePrefix(_)) => Err(attribute_not_found(path, qname)),
            Err(e) => Err(e),
        }
    }

    /// Number of attributes on the element at `path`, not counting
    /// namespace declarations.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::check_element`].
    pub fn attribute_count(&self, path: &str) -> Result<usize> {
        let id = self.locate_element(path)?;
        Ok(self.regular_attributes(id).count())
    }

    /// Qualified name of the `index`-th (1-based) attribute, not counting
    /// namespace declarations.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if there is no such attribute.
    pub fn attribute_name(&self, path: &str, index: usize) -> Result<String> {
        let id = self.locate_element(path)?;
        let count = self.regular_attributes(id).count();
        index
            .checked_sub(1)
            .and_then(|i| self.regular_attributes(id).nth(i))
            .map(Attribute::qualified_name)
            .ok_or(Error::IndexOutOfRange { index, count })
    }

    // --- Helpers ---

    fn regular_attributes(&self, id: NodeId) -> impl Iterator<Item = &Attribute> + '_ {
        self.tree
            .attributes(id)
            .iter()
            .filter(|attr| !attr.is_namespace_declaration())
    }

    pub(super) fn nth_element_child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        index
            .checked_sub(1)
            .and_then(|i| self.tree.element_children(id).nth(i))
            .ok_or_else(|| Error::IndexOutOfRange {
                index,
                count: self.tree.element_children(id).count(),
            })
    }

    pub(super) fn attribute_at(&self, element: NodeId, index: usize) -> Result<&Attribute> {
        self.tree
            .attributes(element)
            .get(index)
            .ok_or_else(|| Error::Internal(format!("stale attribute index {index}")))
    }

    fn node_name(&self, node: XPathNode) -> String {
        let id = match node {
            XPathNode::Attribute { element, index } => {
                return self
                    .tree
                    .attributes(element)
                    .get(index)
                    .map(Attribute::qualified_name)
                    .unwrap_or_default();
            }
            XPathNode::Node(id) => id,
        };
        match &self.tree.node(id).kind {
            NodeKind::Element { .. } => self.tree.qualified_name(id).unwrap_or_default(),
            NodeKind::Text { .. } => "#text".to_string(),
            NodeKind::CData { .. } => "#cdata-section".to_string(),
            NodeKind::Comment { .. } => "#comment".to_string(),
            NodeKind::ProcessingInstruction { target, .. } => target.clone(),
            NodeKind::Document => "#document".to_string(),
            NodeKind::DocumentType { .. } => "#doctype".to_string(),
        }
    }
}

pub(super) fn attribute_not_found(path: &str, qname: &str) -> Error {
    Error::AttributeNotFound {
        path: super::normalize_path(path).to_string(),
        name: qname.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const HTML: &str = "http://www.w3.org/TR/html4/";
    const DOC: &str = r#"<root>
  <h:table xmlns:h="http://www.w3.org/TR/html4/" h:border="1" xmlns:x="urn:x" summary="fruit">
    <h:tr><h:td>Apples</h:td><h:td>Bananas</h:td><!-- more --></h:tr>
  </h:table>
  <aircraft xmlns="http://www.dlr.de/cpacs"><modelname>D150</modelname></aircraft>
</root>"#;

    fn doc() -> XmlDocument {
        let mut doc = XmlDocument::parse_str(DOC).unwrap();
        doc.register_namespace(HTML, "html").unwrap();
        doc
    }

    #[test]
    fn test_count_matches() {
        let doc = doc();
        assert_eq!(doc.count_matches("//html:td").unwrap(), 2);
        assert_eq!(doc.count_matches("//missing").unwrap(), 0);
        assert!(doc.count_matches("1 + 1").is_err());
    }

    #[test]
    fn test_match_name() {
        let doc = doc();
        assert_eq!(doc.match_name("//html:td", 1).unwrap(), "h:td");
        assert_eq!(doc.match_name("//html:table/@*", 1).unwrap(), "h:border");
        assert_eq!(doc.match_name("//html:td/text()", 2).unwrap(), "#text");
        assert_eq!(doc.match_name("//comment()", 1).unwrap(), "#comment");
        assert_eq!(doc.match_name("/root/*", 2).unwrap(), "aircraft");
    }

    #[test]
    fn test_match_path() {
        let doc = doc();
        assert_eq!(
            doc.match_path("//html:td", 2).unwrap(),
            "/root/h:table/h:tr/h:td[2]"
        );
        assert_eq!(doc.match_path("/root/*/*", 2).unwrap(), "/root/*[2]/*");
        assert_eq!(
            doc.match_path("//@summary", 1).unwrap(),
            "/root/h:table/@summary"
        );
    }

    #[test]
    fn test_match_text() {
        let doc = doc();
        assert_eq!(doc.match_text("//html:td", 2).unwrap(), "Bananas");
        assert_eq!(doc.match_text("//@html:border", 1).unwrap(), "1");
        assert!(matches!(
            doc.match_text("//html:td", 3),
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));
    }

    #[test]
    fn test_text_accepts_trailing_slash() {
        let doc = doc();
        assert_eq!(doc.text("/root/html:table/html:tr/html:td[1]/").unwrap(), "Apples");
        assert_eq!(doc.text("/root/html:table/@summary").unwrap(), "fruit");
    }

    #[test]
    fn test_element_namespace() {
        let doc = doc();
        assert_eq!(
            doc.element_namespace("/root/html:table").unwrap().as_deref(),
            Some(HTML)
        );
        assert_eq!(doc.element_namespace("/root").unwrap(), None);
    }

    #[test]
    fn test_children() {
        let doc = doc();
        let tr = "/root/html:table/html:tr";
        assert_eq!(doc.child_count(tr).unwrap(), 2);
        assert_eq!(doc.child_name(tr, 1).unwrap(), "h:td");
        assert!(matches!(
            doc.child_name(tr, 3),
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));
        assert_eq!(doc.named_children_count(tr, "html:td").unwrap(), 2);
        assert_eq!(doc.named_children_count(tr, "td").unwrap(), 0);
        assert!(matches!(
            doc.named_children_count(tr, "g:td"),
            Err(Error::InvalidNamespacePrefix(_))
        ));
    }

    #[test]
    fn test_attributes_skip_declarations() {
        let doc = doc();
        let table = "/root/html:table";
        assert_eq!(doc.attribute_count(table).unwrap(), 2);
        assert_eq!(doc.attribute_name(table, 1).unwrap(), "h:border");
        assert_eq!(doc.attribute_name(table, 2).unwrap(), "summary");
        assert!(doc.attribute_name(table, 3).is_err());
        assert!(doc.attribute_name(table, 0).is_err());
    }

    #[test]
    fn test_attribute_by_qualified_name() {
        let doc = doc();
        let table = "/root/html:table";
        assert_eq!(doc.attribute(table, "html:border").unwrap(), "1");
        assert_eq!(doc.attribute(table, "summary").unwrap(), "fruit");
        assert!(matches!(
            doc.attribute(table, "border"),
            Err(Error::AttributeNotFound { .. })
        ));
        assert!(matches!(
            doc.attribute(table, "g:border"),
            Err(Error::InvalidNamespacePrefix(_))
        ));
        assert!(matches!(
            doc.check_attribute(table, "g:border"),
            Err(Error::AttributeNotFound { .. })
        ));
        assert!(doc.check_attribute(table, "html:border").is_ok());
    }
}
