//! The document aggregate: a tree, its prefix bindings and its expression
//! cache.
//!
//! Every path-based entry point evaluates its path through
//! [`XmlDocument::evaluate`], which checks that all prefixes are registered,
//! consults the cache and only then evaluates. Every mutation runs through
//! [`XmlDocument::mutate`], which clears the cache afterwards.
//!
//! Queries live in `query.rs`, mutations in `edit.rs`.

mod edit;
mod query;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::namespace::NamespaceTable;
use crate::serial::{serialize_with_options, SerializeOptions};
use crate::tree::{Document, NodeId};
use crate::xpath::{self, CacheStats, ExpressionCache, XPathError, XPathNode, XPathValue};

/// An XML document addressed by XPath.
///
/// # Examples
///
/// ```
/// use xmlpath::XmlDocument;
///
/// let mut doc = XmlDocument::create("cpacs").unwrap();
/// doc.create_element("/cpacs", "header").unwrap();
/// assert_eq!(
///     doc.to_xml_string(),
///     "<?xml version=\"1.0\"?>\n<cpacs>\n  <header/>\n</cpacs>\n"
/// );
/// ```
#[derive(Debug)]
pub struct XmlDocument {
    tree: Document,
    namespaces: NamespaceTable,
    cache: RefCell<ExpressionCache>,
    pretty_print: bool,
}

impl XmlDocument {
    // --- Lifecycle ---

    /// Wraps an existing tree. The namespace table starts empty.
    #[must_use]
    pub fn from_document(tree: Document) -> Self {
        Self {
            tree,
            namespaces: NamespaceTable::new(),
            cache: RefCell::new(ExpressionCache::new()),
            pretty_print: true,
        }
    }

    /// Creates a document with a single empty root element.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `root_name` is empty, prefixed or
    /// contains whitespace. Use [`XmlDocument::set_element_namespace`] to put
    /// the root in a namespace.
    pub fn create(root_name: &str) -> Result<Self> {
        edit::check_local_name(root_name)?;
        Ok(Self::from_document(Document::with_root_element(root_name)))
    }

    /// Parses a document from text.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] if the input is not well-formed.
    pub fn parse_str(input: &str) -> Result<Self> {
        Ok(Self::from_document(Document::parse_str(input)?))
    }

    /// Parses a document from bytes in any encoding the XML declaration or a
    /// byte order mark announces.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] if the input cannot be decoded or is not well-formed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        Ok(Self::from_document(Document::parse_bytes(input)?))
    }

    /// Reads and parses a file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Parse`] if it is
    /// not well-formed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let doc = Self::parse_bytes(&bytes)?;
        tracing::debug!(path = %path.display(), nodes = doc.tree.node_count(), "opened document");
        Ok(doc)
    }

    /// Serializes the document, indented if pretty printing is on.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let options = SerializeOptions::default()
            .indent(self.pretty_print)
            .indent_str("  ");
        serialize_with_options(&self.tree, &options)
    }

    /// Writes [`XmlDocument::to_xml_string`] to `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_xml_string())?;
        Ok(())
    }

    #[must_use]
    pub fn pretty_print(&self) -> bool {
        self.pretty_print
    }

    /// Turns indentation of element-only content on or off. On by default.
    pub fn set_pretty_print(&mut self, pretty_print: bool) {
        self.pretty_print = pretty_print;
    }

    /// The underlying tree.
    #[must_use]
    pub fn tree(&self) -> &Document {
        &self.tree
    }

    #[must_use]
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    // --- Namespace registration ---

    /// Binds `prefix` to `uri` for use in expressions and qualified names.
    ///
    /// # Errors
    ///
    /// See [`NamespaceTable::register`].
    pub fn register_namespace(&mut self, uri: &str, prefix: &str) -> Result<()> {
        self.namespaces.register(uri, prefix)?;
        self.cache.get_mut().clear();
        Ok(())
    }

    /// Registers every prefixed declaration in the document. Returns the
    /// number registered.
    pub fn register_namespaces_from_document(&mut self) -> usize {
        let registered = self.namespaces.register_from_document(&self.tree);
        self.cache.get_mut().clear();
        registered
    }

    // --- Evaluation ---

    /// Evaluates `expression` from the Document node.
    ///
    /// Every prefix in the expression must be registered; otherwise this
    /// fails before the cache is consulted. Results are cached by exact
    /// expression text until the next mutation or registration.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidXPath`] for syntax errors, unregistered prefixes and
    /// evaluation errors.
    pub fn evaluate(&self, expression: &str) -> Result<Rc<XPathValue>> {
        let prefixes = xpath::referenced_prefixes(expression)
            .map_err(|e| Error::from_xpath(expression, e))?;
        if let Some(prefix) = prefixes
            .into_iter()
            .find(|p| self.namespaces.resolve(p).is_none())
        {
            return Err(Error::from_xpath(
                expression,
                XPathError::UnresolvedPrefix { prefix },
            ));
        }

        if let Some(hit) = self.cache.borrow_mut().get(expression) {
            tracing::trace!(expression, "expression cache hit");
            return Ok(hit);
        }
        tracing::trace!(expression, "expression cache miss");

        let value = xpath::evaluate_with_namespaces(
            &self.tree,
            self.tree.root(),
            expression,
            &self.namespaces,
        )
        .map_err(|e| Error::from_xpath(expression, e))?;
        let value = Rc::new(value);
        self.cache
            .borrow_mut()
            .insert(expression, Rc::clone(&value));
        Ok(value)
    }

    /// Hit and miss counters of the expression cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    /// Evaluates an expression that must select nodes.
    fn select(&self, expression: &str) -> Result<Vec<XPathNode>> {
        let value = self.evaluate(expression)?;
        value
            .as_node_set()
            .map(<[XPathNode]>::to_vec)
            .ok_or_else(|| Error::InvalidXPath {
                expression: expression.to_string(),
                reason: format!("expression yields a {}, not a node-set", value.type_name()),
            })
    }

    /// The `index`-th (1-based) node selected by `expression`.
    fn nth_match(&self, expression: &str, index: usize) -> Result<XPathNode> {
        let nodes = self.select(expression)?;
        index
            .checked_sub(1)
            .and_then(|i| nodes.get(i).copied())
            .ok_or(Error::IndexOutOfRange {
                index,
                count: nodes.len(),
            })
    }

    /// The single element selected by the element path `path`.
    fn locate_element(&self, path: &str) -> Result<NodeId> {
        let path = normalize_path(path);
        let nodes = self.select(path)?;
        match nodes.as_slice() {
            [] => Err(Error::ElementNotFound(path.to_string())),
            [XPathNode::Node(id)] if self.tree.is_element(*id) => Ok(*id),
            [_] => Err(Error::NotAnElement(path.to_string())),
            _ => Err(Error::ElementPathNotUnique {
                path: path.to_string(),
                count: nodes.len(),
            }),
        }
    }

    /// The single node selected by `path`, attributes included.
    fn locate_node(&self, path: &str) -> Result<XPathNode> {
        let path = normalize_path(path);
        let nodes = self.select(path)?;
        match nodes.as_slice() {
            [] => Err(Error::ElementNotFound(path.to_string())),
            [node] => Ok(*node),
            _ => Err(Error::ElementPathNotUnique {
                path: path.to_string(),
                count: nodes.len(),
            }),
        }
    }

    /// Runs a tree mutation and invalidates the expression cache.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let result = f(&mut self.tree);
        self.cache.get_mut().clear();
        result
    }
}

/// Drops one trailing `/` from an element path (`/root/a/` is `/root/a`).
fn normalize_path(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOC: &str = r#"<root><h:table xmlns:h="http://www.w3.org/TR/html4/"><h:tr><h:td>Apples</h:td><h:td>Bananas</h:td></h:tr></h:table></root>"#;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/root/a/"), "/root/a");
        assert_eq!(normalize_path("/root/a"), "/root/a");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/root//"), "/root/");
    }

    #[test]
    fn test_evaluate_caches_by_text() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let first = doc.evaluate("count(//*)").unwrap();
        let second = doc.evaluate("count(//*)").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        let stats = doc.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_unregistered_prefix_skips_cache() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let err = doc.evaluate("//h:td").unwrap_err();
        assert!(matches!(err, Error::InvalidXPath { .. }));
        assert_eq!(doc.cache_stats(), CacheStats::default());
    }

    #[test]
    fn test_syntax_error_is_invalid_xpath() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        assert!(matches!(
            doc.evaluate("/root/[").unwrap_err(),
            Error::InvalidXPath { .. }
        ));
        assert_eq!(doc.cache_stats().entries, 0);
    }

    #[test]
    fn test_registration_clears_cache() {
        let mut doc = XmlDocument::parse_str(DOC).unwrap();
        doc.evaluate("/root").unwrap();
        doc.register_namespace("urn:x", "x").unwrap();
        assert_eq!(doc.cache_stats().entries, 0);
    }

    #[test]
    fn test_locate_element_errors() {
        let mut doc = XmlDocument::parse_str(DOC).unwrap();
        doc.register_namespace("http://www.w3.org/TR/html4/", "h")
            .unwrap();
        assert!(matches!(
            doc.locate_element("/root/missing"),
            Err(Error::ElementNotFound(_))
        ));
        assert!(matches!(
            doc.locate_element("//h:td"),
            Err(Error::ElementPathNotUnique { count: 2, .. })
        ));
        assert!(matches!(
            doc.locate_element("//h:td[1]/text()"),
            Err(Error::NotAnElement(_))
        ));
        assert!(matches!(
            doc.locate_element("count(//h:td)"),
            Err(Error::InvalidXPath { .. })
        ));
        assert!(doc.locate_element("/root/h:table/").is_ok());
    }

    #[test]
    fn test_nth_match_bounds() {
        let mut doc = XmlDocument::parse_str(DOC).unwrap();
        doc.register_namespace("http://www.w3.org/TR/html4/", "h")
            .unwrap();
        assert!(doc.nth_match("//h:td", 2).is_ok());
        assert!(matches!(
            doc.nth_match("//h:td", 0),
            Err(Error::IndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(matches!(
            doc.nth_match("//h:td", 3),
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));
    }

    #[test]
    fn test_create_rejects_bad_root_names() {
        for name in ["c:root", "", "a b", "root\t"] {
            assert!(
                matches!(XmlDocument::create(name), Err(Error::InvalidArgument(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_save_and_open() {
        let path = std::env::temp_dir().join(format!("xmlpath-{}.xml", std::process::id()));
        let doc = XmlDocument::parse_str(DOC).unwrap();
        doc.save(&path).unwrap();
        let reopened = XmlDocument::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reopened.to_xml_string(), doc.to_xml_string());
    }

    #[test]
    fn test_open_missing_file() {
        let err = XmlDocument::open("/nonexistent/dir/doc.xml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
