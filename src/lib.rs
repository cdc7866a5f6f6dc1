//! # xmlpath
//!
//! Address and edit XML documents by XPath expression, with full namespace
//! support and a per-document cache of evaluated expressions.
//!
//! An [`XmlDocument`] owns three things: the node tree, a [`NamespaceTable`]
//! mapping prefixes to URIs for use in expressions, and an expression cache.
//! Every query goes through the cache; every mutation clears it.
//!
//! ## Quick Start
//!
//! ```
//! use xmlpath::XmlDocument;
//!
//! let mut doc = XmlDocument::parse_str(
//!     r#"<root><h:table xmlns:h="http://www.w3.org/TR/html4/">
//!          <h:tr><h:td>Apples</h:td><h:td>Bananas</h:td></h:tr>
//!        </h:table></root>"#,
//! )
//! .unwrap();
//!
//! // Prefixes in expressions must be registered first.
//! assert!(doc.text("/root/h:table/h:tr/h:td[1]").is_err());
//!
//! doc.register_namespace("http://www.w3.org/TR/html4/", "h").unwrap();
//! assert_eq!(doc.text("/root/h:table/h:tr/h:td[1]").unwrap(), "Apples");
//! assert_eq!(doc.count_matches("//h:td").unwrap(), 2);
//! ```

pub mod document;
pub mod encoding;
pub mod error;
pub mod namespace;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod util;
pub mod xpath;

// Re-export primary types at the crate root for convenience.
pub use document::XmlDocument;
pub use error::{Error, Result};
pub use namespace::NamespaceTable;
pub use tree::{Attribute, Document, NodeId};
pub use util::qname::split_qname;
