//! Node and attribute payloads.
//!
//! Each `NodeKind` variant carries the data for one kind of node. Namespace
//! declarations are not a node kind: they live in an element's attribute list
//! as `xmlns` / `xmlns:prefix` attributes, which is how they appear in the
//! serialized document.

use crate::util::qname::join_qname;

/// The reserved `xml` prefix's namespace.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace of `xmlns` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Checks a namespace declaration against the reserved `xml` and `xmlns`
/// bindings.
///
/// Returns the reason a binding is rejected. An empty `uri` (undeclaring
/// the default namespace) is always allowed.
#[must_use]
pub fn reserved_binding_error(prefix: Option<&str>, uri: &str) -> Option<&'static str> {
    match prefix {
        Some("xmlns") => Some("the 'xmlns' prefix must not be declared"),
        Some("xml") if uri != XML_NAMESPACE => {
            Some("the 'xml' prefix must be bound to the XML namespace")
        }
        Some("xml") => None,
        Some(_) if uri == XML_NAMESPACE => {
            Some("only the 'xml' prefix may be bound to the XML namespace")
        }
        None if uri == XML_NAMESPACE => {
            Some("the xml namespace must not be declared as the default namespace")
        }
        _ if uri == XMLNS_NAMESPACE => Some("the xmlns namespace must not be bound to any prefix"),
        _ => None,
    }
}

/// The type and payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; parent of the root element and top-level misc.
    Document,

    /// An element with its resolved namespace and attributes.
    Element {
        /// Local name.
        name: String,
        /// Prefix used when serializing, if any.
        prefix: Option<String>,
        /// Namespace URI, if the element is in a namespace.
        namespace: Option<String>,
        /// Attributes in source order, namespace declarations included.
        attributes: Vec<Attribute>,
    },

    Text {
        content: String,
    },

    CData {
        content: String,
    },

    Comment {
        content: String,
    },

    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },

    /// A `<!DOCTYPE ...>` declaration kept verbatim.
    DocumentType {
        content: String,
    },
}

impl NodeKind {
    /// Returns `true` for [`NodeKind::Element`].
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The local part of the name (`"lang"` for `xml:lang`).
    pub name: String,
    /// The attribute value with entity references expanded.
    pub value: String,
    /// Prefix used when serializing, if any.
    pub prefix: Option<String>,
    /// Namespace URI, if any. Unprefixed attributes are never namespaced.
    pub namespace: Option<String>,
}

impl Attribute {
    /// Creates an attribute in no namespace.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            prefix: None,
            namespace: None,
        }
    }

    /// Creates a namespaced attribute serialized as `prefix:name`.
    #[must_use]
    pub fn namespaced(prefix: &str, name: &str, namespace: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            prefix: Some(prefix.to_string()),
            namespace: Some(namespace.to_string()),
        }
    }

    /// Creates a namespace declaration binding `prefix` (or the default
    /// namespace for `None`) to `uri`.
    #[must_use]
    pub fn declaration(prefix: Option<&str>, uri: &str) -> Self {
        match prefix {
            Some(p) => Self::namespaced("xmlns", p, XMLNS_NAMESPACE, uri),
            None => Self {
                name: "xmlns".to_string(),
                value: uri.to_string(),
                prefix: None,
                namespace: Some(XMLNS_NAMESPACE.to_string()),
            },
        }
    }

    /// If this attribute is a namespace declaration, returns the prefix it
    /// declares (`Some(None)` for the default namespace).
    #[must_use]
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        match self.prefix.as_deref() {
            Some("xmlns") => Some(Some(self.name.as_str())),
            None if self.name == "xmlns" => Some(None),
            _ => None,
        }
    }

    /// Returns `true` for `xmlns` and `xmlns:*` attributes.
    #[must_use]
    pub fn is_namespace_declaration(&self) -> bool {
        self.declared_prefix().is_some()
    }

    /// Returns `prefix:name`, or just `name` when unprefixed.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        join_qname(self.prefix.as_deref(), &self.name)
    }

    /// Returns `true` if this is a regular attribute named `name` in
    /// `namespace`.
    #[must_use]
    pub fn matches(&self, namespace: Option<&str>, name: &str) -> bool {
        !self.is_namespace_declaration()
            && self.name == name
            && self.namespace.as_deref() == namespace
    }
}
