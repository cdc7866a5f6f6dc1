//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Document`]
//! and are referenced by [`NodeId`], a newtype over `NonZeroU32`. Navigation
//! links (parent, first/last child, siblings) are arena indices, so the tree
//! has no reference cycles and is freed in one go when the document drops.
//!
//! Detached nodes stay in the arena. Node ids are therefore stable for the
//! lifetime of the document, but id order is allocation order, not document
//! order; use [`Document::order_key`] to sort.

mod node;
mod path;

pub use node::{reserved_binding_error, Attribute, NodeKind, XMLNS_NAMESPACE, XML_NAMESPACE};

use std::num::NonZeroU32;

use crate::error::ParseError;

/// A typed index into the document's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// # Panics
    ///
    /// Panics if `index` is 0 or does not fit in a `u32`.
    #[allow(clippy::expect_used)]
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).expect("node arena exceeds u32::MAX entries");
        Self(NonZeroU32::new(raw).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An XML document tree.
///
/// Navigation goes through `&Document`, mutation through `&mut Document`.
///
/// # Examples
///
/// ```
/// use xmlpath::Document;
///
/// let doc = Document::parse_str("<root><child/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// assert_eq!(doc.element_children(root).count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The Document node, not the root element.
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration, if one was given.
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates an empty document containing only the Document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Creates a document whose only content is an empty root element.
    ///
    /// A prefixed `root_name` is not supported here; use
    /// [`Document::set_element_name`] afterwards to put the root in a
    /// namespace.
    #[must_use]
    pub fn with_root_element(root_name: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.create_element(root_name, None, None);
        doc.append_child(doc.root, root);
        doc
    }

    /// Parses a document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the input is not well-formed or uses an
    /// undeclared namespace prefix.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses a document from raw bytes, detecting the character encoding
    /// from a byte order mark or the XML declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the bytes cannot be decoded or parsed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        let text = crate::encoding::decode_to_utf8(input)?;
        crate::parser::parse_str(&text)
    }

    /// Returns the Document node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the root element, if there is one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.is_element(id))
    }

    /// Returns the data for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).kind.is_element()
    }

    /// Returns the local name of an element or the target of a processing
    /// instruction.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the serialized prefix of an element.
    #[must_use]
    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, .. } => prefix.as_deref(),
            _ => None,
        }
    }

    /// Returns the namespace URI of an element.
    #[must_use]
    pub fn node_namespace(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    /// Returns the qualified name (`prefix:local`) of an element, or the
    /// target of a processing instruction.
    #[must_use]
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element { name, prefix, .. } => {
                Some(crate::util::qname::join_qname(prefix.as_deref(), name))
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    /// Returns the content of a text-like node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Concatenates all descendant text and CDATA content.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => content.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone().unwrap_or_default(),
            _ => self
                .descendants(id)
                .filter_map(|d| match &self.node(d).kind {
                    NodeKind::Text { content } | NodeKind::CData { content } => {
                        Some(content.as_str())
                    }
                    _ => None,
                })
                .collect(),
        }
    }

    /// Returns all attributes of an element, namespace declarations included.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Looks up a regular attribute by namespace and local name.
    #[must_use]
    pub fn find_attribute(
        &self,
        id: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<&Attribute> {
        self.attributes(id)
            .iter()
            .find(|a| a.matches(namespace, name))
    }

    /// Returns the value of the un-namespaced attribute `name`.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.find_attribute(id, None, name).map(|a| a.value.as_str())
    }

    // --- Namespaces in scope ---

    /// Iterates the namespace declarations made on `id` itself.
    pub fn namespace_declarations(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = (Option<&str>, &str)> + '_ {
        self.attributes(id)
            .iter()
            .filter_map(|a| a.declared_prefix().map(|p| (p, a.value.as_str())))
    }

    /// Resolves `prefix` (or the default namespace for `None`) at `id` by
    /// walking the declarations of `id` and its ancestors.
    ///
    /// `xmlns=""` undeclares the default namespace and yields `None`.
    #[must_use]
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.ancestors(id)
            .find_map(|anc| {
                self.namespace_declarations(anc)
                    .find(|(p, _)| *p == prefix)
                    .map(|(_, uri)| uri)
            })
            .filter(|uri| !uri.is_empty())
    }

    /// Finds a prefix bound to `uri` that is in scope at `id` and not
    /// shadowed by a closer declaration. `Some(None)` means the default
    /// namespace is `uri`.
    #[must_use]
    pub fn lookup_prefix(&self, id: NodeId, uri: &str) -> Option<Option<&str>> {
        if uri == XML_NAMESPACE {
            return Some(Some("xml"));
        }
        self.ancestors(id).find_map(|anc| {
            self.namespace_declarations(anc)
                .filter(|(_, declared)| *declared == uri)
                .map(|(prefix, _)| prefix)
                .find(|prefix| self.lookup_namespace_uri(id, *prefix) == Some(uri))
        })
    }

    /// Declares `prefix` as `uri` on element `id`, replacing an existing
    /// declaration of the same prefix there.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: Option<&str>, uri: &str) {
        let decl = Attribute::declaration(prefix, uri);
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            match attributes
                .iter_mut()
                .find(|a| a.declared_prefix() == Some(prefix))
            {
                Some(existing) => existing.value = decl.value,
                None => {
                    // Declarations go before regular attributes.
                    let at = attributes
                        .iter()
                        .take_while(|a| a.is_namespace_declaration())
                        .count();
                    attributes.insert(at, decl);
                }
            }
        }
    }

    // --- Navigation ---

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Iterates the children of `id` in order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Iterates the element children of `id` in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| self.is_element(c))
    }

    /// Iterates `id` and then its ancestors up to the Document node.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Iterates the descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Mutation ---

    /// Allocates a detached node.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocates a detached element with no attributes.
    pub fn create_element(
        &mut self,
        name: &str,
        prefix: Option<&str>,
        namespace: Option<&str>,
    ) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
        })
    }

    /// Allocates a detached text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.create_node(NodeKind::Text {
            content: content.to_string(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Inserts `new_child` immediately before `reference`. Does nothing if
    /// `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        let Some(parent) = self.node(reference).parent else {
            return;
        };
        self.node_mut(new_child).parent = Some(parent);

        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }

        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
    }

    /// Inserts `child` so that it becomes the `position`-th (1-based)
    /// element child of `parent`. Positions past the end append; position 0
    /// is treated as 1.
    pub fn insert_element_at(&mut self, parent: NodeId, child: NodeId, position: usize) {
        let reference = self
            .element_children(parent)
            .nth(position.saturating_sub(1));
        match reference {
            Some(reference) => self.insert_before(reference, child),
            None => self.append_child(parent, child),
        }
    }

    /// Unlinks `id` from its parent and siblings. The node (and its
    /// subtree) stays allocated but is no longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let data = self.node_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }

    /// Replaces every child of `id` with a single text node (none if `text`
    /// is empty).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        while let Some(child) = self.first_child(id) {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Renames an element and moves it to `namespace`.
    pub fn set_element_name(
        &mut self,
        id: NodeId,
        local: &str,
        new_prefix: Option<&str>,
        new_namespace: Option<&str>,
    ) {
        if let NodeKind::Element {
            name,
            prefix,
            namespace,
            ..
        } = &mut self.node_mut(id).kind
        {
            *name = local.to_string();
            *prefix = new_prefix.map(str::to_string);
            *namespace = new_namespace.map(str::to_string);
        }
    }

    /// Adds `attr` to an element, replacing the value of an existing
    /// attribute with the same namespace and local name.
    pub fn set_attribute(&mut self, id: NodeId, attr: Attribute) {
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            match attributes
                .iter_mut()
                .find(|a| a.matches(attr.namespace.as_deref(), &attr.name))
            {
                Some(existing) => {
                    existing.value = attr.value;
                    existing.prefix = attr.prefix;
                }
                None => attributes.push(attr),
            }
        }
    }

    /// Sets the value of the `index`-th entry of an element's attribute list.
    pub fn set_attribute_value(&mut self, id: NodeId, index: usize, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            if let Some(attr) = attributes.get_mut(index) {
                attr.value = value.to_string();
            }
        }
    }

    /// Removes a regular attribute, returning it if it existed.
    pub fn remove_attribute(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<Attribute> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attributes, .. } => {
                let pos = attributes.iter().position(|a| a.matches(namespace, name))?;
                Some(attributes.remove(pos))
            }
            _ => None,
        }
    }

    /// Number of allocated nodes, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // subtract placeholder at index 0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Climb until an ancestor below `root` has a next sibling.
        let mut cursor = Some(current);
        while let Some(node) = cursor {
            if node == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(node) {
                self.next = Some(sibling);
                return Some(current);
            }
            cursor = self.doc.parent(node);
        }

        self.next = None;
        Some(current)
    }
}
