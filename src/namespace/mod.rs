//! The prefix bindings used to resolve qualified names in queries.
//!
//! A [`NamespaceTable`] maps prefixes to namespace URIs for one document. It
//! is independent of the `xmlns` declarations in the tree: a query names
//! elements by the prefixes registered here, and the prefixes the document
//! happens to use are irrelevant. [`NamespaceTable::register_from_document`]
//! copies the document's own declarations into the table when that is what
//! the caller wants.
//!
//! # Examples
//!
//! ```
//! use xmlpath::NamespaceTable;
//!
//! let mut table = NamespaceTable::new();
//! table.register("http://www.w3.org/TR/html4/", "h").unwrap();
//! assert_eq!(table.resolve("h"), Some("http://www.w3.org/TR/html4/"));
//!
//! // Last registration wins.
//! table.register("urn:other", "h").unwrap();
//! assert_eq!(table.resolve("h"), Some("urn:other"));
//! ```

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::tree::{Document, XML_NAMESPACE};
use crate::util::qname::{is_valid_prefix, split_qname};

/// Prefix to URI bindings, in registration order.
///
/// The `xml` prefix always resolves to the XML namespace and is not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: IndexMap<String, String>,
}

impl NamespaceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, replacing any earlier binding of `prefix`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNamespaceUri`] if `uri` is empty.
    /// - [`Error::InvalidArgument`] if `prefix` is empty, contains a colon or
    ///   whitespace, or tries to rebind `xml`.
    ///
    /// The table is unchanged on error.
    pub fn register(&mut self, uri: &str, prefix: &str) -> Result<()> {
        if uri.is_empty() {
            return Err(Error::InvalidNamespaceUri);
        }
        if !is_valid_prefix(prefix) {
            return Err(Error::InvalidArgument(format!(
                "'{prefix}' is not a valid namespace prefix"
            )));
        }
        if prefix == "xml" {
            if uri == XML_NAMESPACE {
                return Ok(());
            }
            return Err(Error::InvalidArgument(
                "the 'xml' prefix cannot be rebound".to_string(),
            ));
        }
        let previous = self.entries.insert(prefix.to_string(), uri.to_string());
        tracing::debug!(prefix, uri, replaced = ?previous, "registered namespace prefix");
        Ok(())
    }

    /// Registers every prefixed namespace declaration in `doc`, in document
    /// order, so a prefix declared twice ends up bound to the later URI.
    ///
    /// Default namespace declarations are skipped: XPath 1.0 has no way to
    /// name the default namespace without a prefix. Returns the number of
    /// declarations registered.
    pub fn register_from_document(&mut self, doc: &Document) -> usize {
        let mut registered = 0;
        for node in doc.descendants(doc.root()) {
            for (prefix, uri) in doc.namespace_declarations(node) {
                let Some(prefix) = prefix else { continue };
                if self.register(uri, prefix).is_ok() {
                    registered += 1;
                }
            }
        }
        tracing::debug!(registered, entries = self.entries.len(), "registered document namespaces");
        registered
    }

    /// Returns the URI bound to `prefix`.
    #[must_use]
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.entries.get(prefix).map(String::as_str)
    }

    /// Splits `qname` and resolves its prefix.
    ///
    /// Returns the namespace URI (`None` for an unprefixed name) and the
    /// local part.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNamespacePrefix`] if the prefix is not registered.
    pub fn resolve_qname<'q>(&self, qname: &'q str) -> Result<(Option<&str>, &'q str)> {
        match split_qname(qname) {
            (None, local) => Ok((None, local)),
            (Some(prefix), local) => self
                .resolve(prefix)
                .map(|uri| (Some(uri), local))
                .ok_or_else(|| Error::InvalidNamespacePrefix(prefix.to_string())),
        }
    }

    /// Returns `true` if `prefix` has been registered. `xml` is never
    /// registered.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.entries.contains_key(prefix)
    }

    /// Iterates `(prefix, uri)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
