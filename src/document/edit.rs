use super::query::attribute_not_found;
use super::XmlDocument;
use crate::error::{Error, Result};
use crate::tree::{reserved_binding_error, Attribute, Document, NodeId};
use crate::util::qname::{is_valid_prefix, split_qname};
use crate::xpath::XPathNode;

/// Prefix and namespace for a new or renamed element, plus the
/// declaration it needs (if any) to make the prefix resolve.
struct ElementName {
    prefix: Option<String>,
    namespace: Option<String>,
    declare: Option<(Option<String>, String)>,
}

impl ElementName {
    fn apply(&self, tree: &mut Document, id: NodeId, local: &str) {
        tree.set_element_name(id, local, self.prefix.as_deref(), self.namespace.as_deref());
        if let Some((prefix, uri)) = &self.declare {
            tree.declare_namespace(id, prefix.as_deref(), uri);
        }
    }
}

impl XmlDocument {
    // --- Element creation ---

    /// Appends an empty element named `qname` to the element at
    /// `parent_path`.
    ///
    /// A prefix must be declared in scope at the parent. An unprefixed
    /// name takes the parent's default namespace, if any.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] if the prefix is not in scope.
    pub fn create_element(&mut self, parent_path: &str, qname: &str) -> Result<NodeId> {
        self.insert_element(parent_path, qname, None, None, None)
    }

    /// Like [`XmlDocument::create_element`], inserting the element as the
    /// `index`-th (1-based) element child. An index past the end appends.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] for index 0, otherwise as for
    /// [`XmlDocument::create_element`].
    pub fn create_element_at(
        &mut self,
        parent_path: &str,
        qname: &str,
        index: usize,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, None, None, Some(index))
    }

    /// Appends an empty element named `qname` in namespace `uri`.
    ///
    /// A prefixed name keeps its prefix and declares it on the new element
    /// unless the same binding is already in scope. An unprefixed name
    /// reuses a prefix (or default namespace) already bound to `uri`, or
    /// else declares `uri` as the new element's default namespace.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespaceUri`] if `uri` is empty.
    /// - [`Error::InvalidArgument`] if the declaration would bind a
    ///   reserved prefix (`xml`, `xmlns`) or namespace.
    ///
    /// The tree is left unchanged on error.
    pub fn create_element_ns(
        &mut self,
        parent_path: &str,
        qname: &str,
        uri: &str,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, Some(uri), None, None)
    }

    /// [`XmlDocument::create_element_ns`] at a 1-based element position.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::create_element_ns`].
    pub fn create_element_ns_at(
        &mut self,
        parent_path: &str,
        qname: &str,
        uri: &str,
        index: usize,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, Some(uri), None, Some(index))
    }

    /// Appends an element containing `text`.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::create_element`].
    pub fn add_text_element(
        &mut self,
        parent_path: &str,
        qname: &str,
        text: &str,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, None, Some(text), None)
    }

    /// # Errors
    ///
    /// As for [`XmlDocument::create_element`].
    pub fn add_text_element_at(
        &mut self,
        parent_path: &str,
        qname: &str,
        text: &str,
        index: usize,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, None, Some(text), Some(index))
    }

    /// Appends an element in namespace `uri` containing `text`.
    ///
    /// # Errors
    ///
    /// As for [`XmlDocument::create_element_ns`].
    pub fn add_text_element_ns(
        &mut self,
        parent_path: &str,
        qname: &str,
        uri: &str,
        text: &str,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, Some(uri), Some(text), None)
    }

    /// # Errors
    ///
    /// As for [`XmlDocument::create_element_ns`].
    pub fn add_text_element_ns_at(
        &mut self,
        parent_path: &str,
        qname: &str,
        uri: &str,
        text: &str,
        index: usize,
    ) -> Result<NodeId> {
        self.insert_element(parent_path, qname, Some(uri), Some(text), Some(index))
    }

    fn insert_element(
        &mut self,
        parent_path: &str,
        qname: &str,
        uri: Option<&str>,
        text: Option<&str>,
        index: Option<usize>,
    ) -> Result<NodeId> {
        if uri == Some("") {
            return Err(Error::InvalidNamespaceUri);
        }
        let (prefix, local) = split_qname(qname);
        check_local_name(local)?;
        if let (Some(prefix), Some(_)) = (prefix, uri) {
            check_prefix(prefix)?;
        }
        let parent = self.locate_element(parent_path)?;
        if index == Some(0) {
            return Err(Error::IndexOutOfRange {
                index: 0,
                count: self.tree.element_children(parent).count(),
            });
        }
        let name = match uri {
            Some(uri) => self.namespaced_name(parent, prefix, uri)?,
            None => self.in_scope_name(parent, prefix)?,
        };

        let id = self.mutate(|tree| {
            let id = tree.create_element(local, None, None);
            name.apply(tree, id, local);
            match index {
                Some(index) => tree.insert_element_at(parent, id, index),
                None => tree.append_child(parent, id),
            }
            if let Some(text) = text {
                tree.set_text_content(id, text);
            }
            Ok(id)
        })?;
        tracing::debug!(parent = parent_path, name = qname, namespace = ?name.namespace, "created element");
        Ok(id)
    }

    // --- Element edits ---

    /// Replaces the content of the element at `path` with `text`, or sets
    /// the value of the attribute at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::NotAnElement`] if `path` selects some other kind of node.
    pub fn update_text(&mut self, path: &str, text: &str) -> Result<()> {
        match self.locate_node(path)? {
            XPathNode::Node(id) if self.tree.is_element(id) => self.mutate(|tree| {
                tree.set_text_content(id, text);
                Ok(())
            }),
            XPathNode::Attribute { element, index } => self.mutate(|tree| {
                tree.set_attribute_value(element, index, text);
                Ok(())
            }),
            XPathNode::Node(_) => Err(Error::NotAnElement(
                super::normalize_path(path).to_string(),
            )),
        }?;
        tracing::debug!(path, "updated text");
        Ok(())
    }

    /// Removes the element at `path` with its subtree.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for the root element.
    pub fn remove_element(&mut self, path: &str) -> Result<()> {
        let id = self.locate_element(path)?;
        if self.tree.root_element() == Some(id) {
            return Err(Error::InvalidArgument(
                "the root element cannot be removed".to_string(),
            ));
        }
        self.mutate(|tree| {
            tree.detach(id);
            Ok(())
        })?;
        tracing::debug!(path, "removed element");
        Ok(())
    }

    /// Renames the element at `path`. The prefix of `qname` must be in
    /// scope at the element; an unprefixed name takes the in-scope default
    /// namespace.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] if the prefix is not in scope.
    pub fn rename_element(&mut self, path: &str, qname: &str) -> Result<()> {
        let (prefix, local) = split_qname(qname);
        check_local_name(local)?;
        let id = self.locate_element(path)?;
        let name = self.in_scope_name(id, prefix)?;
        self.mutate(|tree| {
            name.apply(tree, id, local);
            Ok(())
        })?;
        tracing::debug!(path, name = qname, "renamed element");
        Ok(())
    }

    // --- Attributes ---

    /// Sets attribute `qname` on the element at `path`.
    ///
    /// The prefix is resolved through the namespace table. If another
    /// prefix for the same URI is in scope it is used instead; otherwise
    /// the prefix is declared on the element. An existing attribute with
    /// the same URI and local name is overwritten.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] if the prefix is not registered.
    pub fn set_attribute(&mut self, path: &str, qname: &str, value: &str) -> Result<()> {
        let (prefix, local) = split_qname(qname);
        check_local_name(local)?;
        if prefix == Some("xmlns") || (prefix.is_none() && local == "xmlns") {
            return Err(Error::InvalidArgument(
                "namespace declarations are made with declare_namespace".to_string(),
            ));
        }
        let id = self.locate_element(path)?;

        let (attr, declare) = match prefix {
            None => (Attribute::new(local, value), None),
            Some(prefix) => {
                let uri = self
                    .namespaces
                    .resolve(prefix)
                    .ok_or_else(|| Error::InvalidNamespacePrefix(prefix.to_string()))?
                    .to_string();
                let (used, declare) = self.attribute_prefix(id, prefix, &uri)?;
                let attr = Attribute::namespaced(&used, local, &uri, value);
                (attr, declare.then(|| (used, uri)))
            }
        };

        self.mutate(|tree| {
            if let Some((prefix, uri)) = &declare {
                tree.declare_namespace(id, Some(prefix), uri);
            }
            tree.set_attribute(id, attr);
            Ok(())
        })?;
        tracing::debug!(path, name = qname, "set attribute");
        Ok(())
    }

    /// Removes attribute `qname` from the element at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] for an unregistered prefix,
    /// [`Error::AttributeNotFound`] if the attribute does not exist.
    pub fn remove_attribute(&mut self, path: &str, qname: &str) -> Result<()> {
        let id = self.locate_element(path)?;
        let (namespace, local) = self.namespaces.resolve_qname(qname)?;
        if self.tree.find_attribute(id, namespace, local).is_none() {
            return Err(attribute_not_found(path, qname));
        }
        let namespace = namespace.map(str::to_string);
        self.mutate(|tree| {
            tree.remove_attribute(id, namespace.as_deref(), local);
            Ok(())
        })?;
        tracing::debug!(path, name = qname, "removed attribute");
        Ok(())
    }

    // --- Namespace declarations ---

    /// Adds `xmlns:prefix="uri"` to the element at `path`. The element's
    /// own name and namespace are unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespaceUri`] if `uri` is empty.
    /// - [`Error::InvalidArgument`] if `prefix` is empty or malformed.
    /// - [`Error::NamespaceAlreadyDeclared`] if the element already binds
    ///   `prefix` to another URI.
    pub fn declare_namespace(&mut self, path: &str, uri: &str, prefix: &str) -> Result<()> {
        if uri.is_empty() {
            return Err(Error::InvalidNamespaceUri);
        }
        check_prefix(prefix)?;
        check_binding(Some(prefix), uri)?;
        let id = self.locate_element(path)?;
        match self.own_declaration(id, Some(prefix)) {
            Some(existing) if existing == uri => return Ok(()),
            Some(existing) => {
                return Err(Error::NamespaceAlreadyDeclared {
                    prefix: prefix.to_string(),
                    uri: existing.to_string(),
                })
            }
            None => {}
        }
        self.mutate(|tree| {
            tree.declare_namespace(id, Some(prefix), uri);
            Ok(())
        })?;
        tracing::debug!(path, prefix, uri, "declared namespace");
        Ok(())
    }

    /// Moves the element at `path` into namespace `uri`.
    ///
    /// With a prefix, the prefix is declared on the element unless already
    /// bound to `uri` in scope. Without one, an in-scope binding for `uri`
    /// is reused, or else `uri` becomes the element's default namespace and
    /// unprefixed children in no namespace get `xmlns=""` so they stay there.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespaceUri`] if `uri` is empty.
    /// - [`Error::NamespaceAlreadyDeclared`] if the declaration would
    ///   replace a different one on the element itself.
    pub fn set_element_namespace(
        &mut self,
        path: &str,
        uri: &str,
        prefix: Option<&str>,
    ) -> Result<()> {
        if uri.is_empty() {
            return Err(Error::InvalidNamespaceUri);
        }
        if let Some(prefix) = prefix {
            check_prefix(prefix)?;
        }
        let id = self.locate_element(path)?;
        let name = self.namespaced_name(id, prefix, uri)?;
        if let Some((declared, _)) = &name.declare {
            if let Some(existing) = self.own_declaration(id, declared.as_deref()) {
                return Err(Error::NamespaceAlreadyDeclared {
                    prefix: declared.clone().unwrap_or_default(),
                    uri: existing.to_string(),
                });
            }
        }
        // A new default namespace must not capture unprefixed children
        // that are in no namespace.
        let keep_unqualified: Vec<NodeId> = match &name.declare {
            Some((None, _)) => self
                .tree
                .element_children(id)
                .filter(|&child| {
                    self.tree.node_prefix(child).is_none()
                        && self.tree.node_namespace(child).is_none()
                        && self.own_declaration(child, None).is_none()
                })
                .collect(),
            _ => Vec::new(),
        };
        let local = self.tree.node_name(id).unwrap_or_default().to_string();
        self.mutate(|tree| {
            name.apply(tree, id, &local);
            for child in keep_unqualified {
                tree.declare_namespace(child, None, "");
            }
            Ok(())
        })?;
        tracing::debug!(path, uri, prefix, "set element namespace");
        Ok(())
    }

    // --- Name planning ---

    /// Resolves a prefix (or the default namespace) in scope at `scope`.
    fn in_scope_name(&self, scope: NodeId, prefix: Option<&str>) -> Result<ElementName> {
        let namespace = match prefix {
            Some(p) => Some(
                self.tree
                    .lookup_namespace_uri(scope, Some(p))
                    .ok_or_else(|| Error::InvalidNamespacePrefix(p.to_string()))?,
            ),
            None => self.tree.lookup_namespace_uri(scope, None),
        };
        Ok(ElementName {
            prefix: prefix.map(str::to_string),
            namespace: namespace.map(str::to_string),
            declare: None,
        })
    }

    /// Picks the prefix for an element in `uri` whose declarations would
    /// go on an element whose in-scope bindings are those of `scope`.
    ///
    /// A declaration that would bind a reserved prefix or URI is an
    /// [`Error::InvalidArgument`].
    fn namespaced_name(
        &self,
        scope: NodeId,
        prefix: Option<&str>,
        uri: &str,
    ) -> Result<ElementName> {
        let (prefix, declare) = match prefix {
            Some(p) if self.tree.lookup_namespace_uri(scope, Some(p)) == Some(uri) => {
                (Some(p.to_string()), false)
            }
            Some(p) => (Some(p.to_string()), true),
            None => match self.tree.lookup_prefix(scope, uri) {
                Some(existing) => (existing.map(str::to_string), false),
                None => (None, true),
            },
        };
        if declare {
            check_binding(prefix.as_deref(), uri)?;
        }
        Ok(ElementName {
            declare: declare.then(|| (prefix.clone(), uri.to_string())),
            prefix,
            namespace: Some(uri.to_string()),
        })
    }

    /// Chooses the prefix for an attribute in `uri`: `wanted` if it is
    /// already bound to `uri` at the element, else any other in-scope
    /// prefix for `uri`, else `wanted` with a new declaration.
    fn attribute_prefix(&self, id: NodeId, wanted: &str, uri: &str) -> Result<(String, bool)> {
        if self.tree.lookup_namespace_uri(id, Some(wanted)) == Some(uri) {
            return Ok((wanted.to_string(), false));
        }
        let in_scope = self.tree.ancestors(id).find_map(|anc| {
            self.tree
                .namespace_declarations(anc)
                .filter_map(|(p, declared)| p.filter(|_| declared == uri))
                .find(|&p| self.tree.lookup_namespace_uri(id, Some(p)) == Some(uri))
        });
        if let Some(prefix) = in_scope {
            return Ok((prefix.to_string(), false));
        }
        if let Some(existing) = self.own_declaration(id, Some(wanted)) {
            return Err(Error::NamespaceAlreadyDeclared {
                prefix: wanted.to_string(),
                uri: existing.to_string(),
            });
        }
        check_binding(Some(wanted), uri)?;
        Ok((wanted.to_string(), true))
    }

    /// The URI `prefix` is declared as on `id` itself.
    fn own_declaration(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        self.tree
            .namespace_declarations(id)
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| uri)
    }
}

pub(super) fn check_local_name(local: &str) -> Result<()> {
    if local.is_empty() || local.contains(':') || local.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "'{local}' is not a valid element or attribute name"
        )));
    }
    Ok(())
}

fn check_binding(prefix: Option<&str>, uri: &str) -> Result<()> {
    match reserved_binding_error(prefix, uri) {
        Some(reason) => Err(Error::InvalidArgument(reason.to_string())),
        None => Ok(()),
    }
}

fn check_prefix(prefix: &str) -> Result<()> {
    if !is_valid_prefix(prefix) || prefix == "xmlns" {
        return Err(Error::InvalidArgument(format!(
            "'{prefix}' is not a valid namespace prefix"
        )));
    }
    Ok(())
}
