//! XML serializer.
//!
//! Output always starts with an XML declaration and ends with a newline.
//! When indenting, only elements whose content is nothing but elements (and
//! whitespace) are reflowed; mixed content is written as-is so no text
//! changes meaning.

use std::fmt::Write;

use crate::tree::{Document, NodeId, NodeKind};

/// Serialization settings.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Indent element-only content.
    pub indent: bool,
    /// One level of indentation.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes `doc` without indentation.
///
/// # Examples
///
/// ```
/// use xmlpath::Document;
/// use xmlpath::serial::serialize;
///
/// let doc = Document::parse_str("<root><a>1 &lt; 2</a></root>").unwrap();
/// assert_eq!(
///     serialize(&doc),
///     "<?xml version=\"1.0\"?>\n<root><a>1 &lt; 2</a></root>\n"
/// );
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut writer = Writer {
        doc,
        options,
        out: String::new(),
    };
    writer.declaration();
    for (i, child) in doc.children(doc.root()).enumerate() {
        if i > 0 {
            writer.out.push('\n');
        }
        writer.node(child, 0, false);
    }
    writer.out.push('\n');
    writer.out
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    out: String,
}

impl Writer<'_> {
    fn declaration(&mut self) {
        let version = self.doc.version.as_deref().unwrap_or("1.0");
        let _ = write!(self.out, "<?xml version=\"{version}\"");
        if let Some(encoding) = &self.doc.encoding {
            let _ = write!(self.out, " encoding=\"{encoding}\"");
        }
        if let Some(standalone) = self.doc.standalone {
            let value = if standalone { "yes" } else { "no" };
            let _ = write!(self.out, " standalone=\"{value}\"");
        }
        self.out.push_str("?>\n");
    }

    /// Writes one node. `block` is true when the parent is being indented,
    /// in which case the node gets its own line.
    fn node(&mut self, id: NodeId, depth: usize, block: bool) {
        let doc = self.doc;
        if block {
            self.indent(depth);
        }
        match &doc.node(id).kind {
            NodeKind::Element { .. } => self.element(id, depth),
            NodeKind::Text { content } => escape_text(&mut self.out, content),
            NodeKind::CData { content } => {
                let _ = write!(self.out, "<![CDATA[{content}]]>");
            }
            NodeKind::Comment { content } => {
                let _ = write!(self.out, "<!--{content}-->");
            }
            NodeKind::ProcessingInstruction { target, data } => match data {
                Some(data) => {
                    let _ = write!(self.out, "<?{target} {data}?>");
                }
                None => {
                    let _ = write!(self.out, "<?{target}?>");
                }
            },
            NodeKind::DocumentType { content } => {
                let _ = write!(self.out, "<!DOCTYPE {content}>");
            }
            NodeKind::Document => {}
        }
        if block {
            self.out.push('\n');
        }
    }

    fn element(&mut self, id: NodeId, depth: usize) {
        let doc = self.doc;
        let name = doc.qualified_name(id).unwrap_or_default();
        self.out.push('<');
        self.out.push_str(&name);
        for attr in doc.attributes(id) {
            let _ = write!(self.out, " {}=\"", attr.qualified_name());
            escape_attr(&mut self.out, &attr.value);
            self.out.push('"');
        }

        if doc.first_child(id).is_none() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let reflow = self.options.indent && is_element_only(doc, id);
        if reflow {
            self.out.push('\n');
        }
        for child in doc.children(id) {
            if reflow && is_blank_text(doc, child) {
                continue;
            }
            self.node(child, depth + 1, reflow);
        }
        if reflow {
            self.indent(depth);
        }
        let _ = write!(self.out, "</{name}>");
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent_str);
        }
    }
}

fn is_blank_text(doc: &Document, id: NodeId) -> bool {
    matches!(&doc.node(id).kind, NodeKind::Text { content } if content.trim().is_empty())
}

/// Element-only content: at least one element child, and no text other
/// than whitespace.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut has_element = false;
    for child in doc.children(id) {
        match &doc.node(child).kind {
            NodeKind::Element { .. } => has_element = true,
            NodeKind::Text { .. } if is_blank_text(doc, child) => {}
            NodeKind::Text { .. } | NodeKind::CData { .. } => return false,
            _ => {}
        }
    }
    has_element
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
