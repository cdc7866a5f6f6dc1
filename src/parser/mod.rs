//! XML parser.
//!
//! Tokenizing is done by `quick-xml`; this module turns its event stream into
//! a [`Document`] tree and resolves element and attribute prefixes against
//! the `xmlns` declarations in scope. An undeclared prefix is a parse error.

mod scope;

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ParseError, SourceLocation};
use crate::tree::{reserved_binding_error, Attribute, Document, NodeId, NodeKind};
use crate::util::qname::split_qname;

use scope::NamespaceScopes;

/// Default maximum element nesting depth.
pub const DEFAULT_MAX_DEPTH: u32 = 256;

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Drop whitespace-only text nodes.
    pub no_blanks: bool,
    /// Maximum element nesting depth before the input is rejected.
    pub max_depth: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            no_blanks: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn no_blanks(mut self, no_blanks: bool) -> Self {
        self.no_blanks = no_blanks;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed.
///
/// # Examples
///
/// ```
/// use xmlpath::parser::parse_str;
///
/// let doc = parse_str(r#"<a:root xmlns:a="urn:a"/>"#).unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_namespace(root), Some("urn:a"));
/// ```
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed, nests deeper than
/// `options.max_depth`, or uses an undeclared namespace prefix.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let doc = TreeBuilder::new(input, options).run()?;
    tracing::debug!(nodes = doc.node_count(), "parsed document");
    Ok(doc)
}

struct TreeBuilder<'a> {
    input: &'a str,
    options: &'a ParseOptions,
    reader: Reader<&'a [u8]>,
    doc: Document,
    open: Vec<NodeId>,
    scopes: NamespaceScopes,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str, options: &'a ParseOptions) -> Self {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);
        Self {
            input,
            options,
            reader,
            doc: Document::new(),
            open: Vec::new(),
            scopes: NamespaceScopes::new(),
        }
    }

    fn run(mut self) -> Result<Document, ParseError> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|e| self.error(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    let element = self.start_element(&start)?;
                    self.open.push(element);
                }
                Event::Empty(start) => {
                    self.start_element(&start)?;
                    self.scopes.pop_scope();
                }
                Event::End(_) => {
                    self.open.pop();
                    self.scopes.pop_scope();
                }
                Event::Text(text) => {
                    let content = text.unescape().map_err(|e| self.error(e.to_string()))?;
                    self.text(content)?;
                }
                Event::CData(cdata) => {
                    let content = self.utf8(&cdata)?.to_string();
                    self.append(NodeKind::CData { content })?;
                }
                Event::Comment(comment) => {
                    let content = self.utf8(&comment)?.to_string();
                    self.append(NodeKind::Comment { content })?;
                }
                Event::PI(pi) => {
                    let target = self.utf8(pi.target())?.to_string();
                    let data = self.utf8(pi.content())?.trim();
                    let data = (!data.is_empty()).then(|| data.to_string());
                    self.append(NodeKind::ProcessingInstruction { target, data })?;
                }
                Event::Decl(decl) => {
                    let version = decl.version().map_err(|e| self.error(e.to_string()))?;
                    self.doc.version = Some(self.utf8(&version)?.to_string());
                    if let Some(encoding) = decl.encoding() {
                        let encoding = encoding.map_err(|e| self.error(e.to_string()))?;
                        self.doc.encoding = Some(self.utf8(&encoding)?.to_string());
                    }
                    if let Some(standalone) = decl.standalone() {
                        let standalone = standalone.map_err(|e| self.error(e.to_string()))?;
                        self.doc.standalone = Some(&*standalone == b"yes");
                    }
                }
                Event::DocType(doctype) => {
                    let content = self.utf8(&doctype)?.trim().to_string();
                    self.append(NodeKind::DocumentType { content })?;
                }
                Event::Eof => break,
            }
        }

        if !self.open.is_empty() {
            return Err(self.error("premature end of data: unclosed element".to_string()));
        }
        if self.doc.root_element().is_none() {
            return Err(self.error("document has no root element".to_string()));
        }
        Ok(self.doc)
    }

    fn start_element(&mut self, start: &BytesStart<'_>) -> Result<NodeId, ParseError> {
        if self.open.len() >= self.options.max_depth as usize {
            return Err(self.error(format!(
                "maximum nesting depth {} exceeded",
                self.options.max_depth
            )));
        }
        if self.open.is_empty() && self.doc.root_element().is_some() {
            return Err(self.error("extra content after the root element".to_string()));
        }

        let qname = self.utf8(start.name().as_ref())?.to_string();
        let mut raw = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| self.error(e.to_string()))?;
            let key = self.utf8(attr.key.as_ref())?.to_string();
            let value = attr
                .decode_and_unescape_value(self.reader.decoder())
                .map_err(|e| self.error(e.to_string()))?
                .into_owned();
            raw.push((key, value));
        }

        self.scopes.push_scope();
        for (key, value) in &raw {
            let prefix = match key.as_str() {
                "xmlns" => None,
                _ => match key.strip_prefix("xmlns:") {
                    Some(prefix) => Some(prefix),
                    None => continue,
                },
            };
            if let Some(prefix) = prefix {
                if value.is_empty() {
                    return Err(self.error(format!("empty namespace URI for prefix '{prefix}'")));
                }
            }
            if let Some(reason) = reserved_binding_error(prefix, value) {
                return Err(self.error(reason.to_string()));
            }
            self.scopes.bind(prefix, value);
        }

        let (prefix, local) = split_qname(&qname);
        let namespace = self.resolve(prefix, &qname, true)?;
        let mut attributes = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let attribute = match key.as_str() {
                "xmlns" => Attribute::declaration(None, &value),
                _ => match split_qname(&key) {
                    (Some("xmlns"), declared) => Attribute::declaration(Some(declared), &value),
                    (Some(p), name) => {
                        let uri = self.resolve(Some(p), &key, false)?.unwrap_or_default();
                        Attribute::namespaced(p, name, &uri, &value)
                    }
                    (None, name) => Attribute::new(name, &value),
                },
            };
            attributes.push(attribute);
        }

        let element = self.append(NodeKind::Element {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            namespace,
            attributes,
        })?;
        Ok(element)
    }

    /// Resolves an element or attribute prefix. Unprefixed attributes are
    /// never namespaced; unprefixed elements take the default namespace.
    fn resolve(
        &self,
        prefix: Option<&str>,
        qname: &str,
        is_element: bool,
    ) -> Result<Option<String>, ParseError> {
        match prefix {
            None if !is_element => Ok(None),
            None => Ok(self.scopes.resolve(None).map(str::to_string)),
            Some(p) => self
                .scopes
                .resolve(Some(p))
                .map(|uri| Some(uri.to_string()))
                .ok_or_else(|| self.error(format!("namespace prefix '{p}' on {qname} is not defined"))),
        }
    }

    fn text(&mut self, content: Cow<'_, str>) -> Result<(), ParseError> {
        let blank = content.chars().all(|c| c.is_ascii_whitespace());
        if self.open.is_empty() {
            if blank {
                return Ok(());
            }
            return Err(self.error("text content outside the root element".to_string()));
        }
        if blank && self.options.no_blanks {
            return Ok(());
        }
        self.append(NodeKind::Text {
            content: content.into_owned(),
        })?;
        Ok(())
    }

    fn append(&mut self, kind: NodeKind) -> Result<NodeId, ParseError> {
        let parent = self.open.last().copied().unwrap_or(self.doc.root());
        let node = self.doc.create_node(kind);
        self.doc.append_child(parent, node);
        Ok(node)
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> Result<&'b str, ParseError> {
        std::str::from_utf8(bytes).map_err(|e| self.error(e.to_string()))
    }

    fn error(&self, message: String) -> ParseError {
        let offset = usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX);
        ParseError {
            message,
            location: SourceLocation::from_offset(self.input, offset),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tree() {
        let doc = parse_str("<root><a x=\"1\">hi</a><!-- c --><?pi data?></root>").unwrap();
        let root = doc.root_element().unwrap();
        let kids: Vec<_> = doc.children(root).collect();
        assert_eq!(kids.len(), 3);
        assert_eq!(doc.node_name(kids[0]), Some("a"));
        assert_eq!(doc.attribute(kids[0], "x"), Some("1"));
        assert_eq!(doc.text_content(kids[0]), "hi");
        assert_eq!(doc.node_text(kids[1]), Some(" c "));
        assert_eq!(doc.node_name(kids[2]), Some("pi"));
        assert_eq!(doc.node_text(kids[2]), Some("data"));
    }

    #[test]
    fn test_parse_declaration() {
        let doc = parse_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><r/>")
            .unwrap();
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert_eq!(doc.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(doc.standalone, Some(true));
    }

    #[test]
    fn test_parse_entities_are_expanded() {
        let doc = parse_str("<r a=\"&lt;&amp;\">&#65;&gt;</r>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "a"), Some("<&"));
        assert_eq!(doc.text_content(root), "A>");
    }

    #[test]
    fn test_parse_rejects_reserved_bindings() {
        for input in [
            r#"<xmlns:foo xmlns:xmlns="urn:x"/>"#,
            r#"<xml:bar xmlns:xml="urn:y"/>"#,
            r#"<r xmlns:x="http://www.w3.org/XML/1998/namespace"/>"#,
            r#"<r xmlns="http://www.w3.org/2000/xmlns/"/>"#,
        ] {
            let err = parse_str(input).unwrap_err();
            assert!(err.message.contains("must"), "{input}: {}", err.message);
        }
        assert!(parse_str(r#"<r xmlns:xml="http://www.w3.org/XML/1998/namespace"/>"#).is_ok());
    }

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = parse_str(
            r#"<root xmlns:h="urn:h"><h:td h:width="1" size="2"/><x xmlns="urn:d"><y/></x></root>"#,
        )
        .unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_namespace(root), None);

        let td = doc.first_child(root).unwrap();
        assert_eq!(doc.node_namespace(td), Some("urn:h"));
        assert_eq!(doc.node_prefix(td), Some("h"));
        assert_eq!(doc.find_attribute(td, Some("urn:h"), "width").unwrap().value, "1");
        assert_eq!(doc.attribute(td, "size"), Some("2"));

        let x = doc.next_sibling(td).unwrap();
        let y = doc.first_child(x).unwrap();
        assert_eq!(doc.node_namespace(y), Some("urn:d"));
        assert_eq!(doc.node_prefix(y), None);
    }

    #[test]
    fn test_parse_keeps_declarations_as_attributes() {
        let doc = parse_str(r#"<r xmlns="urn:d" xmlns:p="urn:p" a="1"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        let decls: Vec<_> = doc.namespace_declarations(root).collect();
        assert_eq!(decls, [(None, "urn:d"), (Some("p"), "urn:p")]);
        assert_eq!(doc.attributes(root).len(), 3);
    }

    #[test]
    fn test_parse_undeclared_prefix_fails() {
        let err = parse_str("<r><p:a/></r>").unwrap_err();
        assert!(err.message.contains("'p'"), "{}", err.message);
    }

    #[test]
    fn test_parse_default_namespace_undeclared() {
        let doc = parse_str(r#"<r xmlns="urn:d"><a xmlns=""/></r>"#).unwrap();
        let root = doc.root_element().unwrap();
        let a = doc.first_child(root).unwrap();
        assert_eq!(doc.node_namespace(a), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_str("<r><a></r>").is_err());
        assert!(parse_str("<r>").is_err());
        assert!(parse_str("").is_err());
        assert!(parse_str("<a/><b/>").is_err());
        assert!(parse_str("<a/>text").is_err());
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_str("<r>\n  <p:a/>\n</r>").unwrap_err();
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_parse_no_blanks() {
        let input = "<r>\n  <a/>\n</r>";
        let keep = parse_str(input).unwrap();
        let root = keep.root_element().unwrap();
        assert_eq!(keep.children(root).count(), 3);

        let options = ParseOptions::default().no_blanks(true);
        let strip = parse_str_with_options(input, &options).unwrap();
        let root = strip.root_element().unwrap();
        assert_eq!(strip.children(root).count(), 1);
    }

    #[test]
    fn test_parse_max_depth() {
        let options = ParseOptions::default().max_depth(2);
        assert!(parse_str_with_options("<a><b/></a>", &options).is_ok());
        assert!(parse_str_with_options("<a><b><c/></b></a>", &options).is_err());
    }

    #[test]
    fn test_parse_bom_and_doctype() {
        let doc = parse_str("\u{FEFF}<!DOCTYPE r SYSTEM \"r.dtd\"><r/>").unwrap();
        let first = doc.first_child(doc.root()).unwrap();
        assert!(matches!(
            &doc.node(first).kind,
            NodeKind::DocumentType { content } if content == "r SYSTEM \"r.dtd\""
        ));
    }
}
